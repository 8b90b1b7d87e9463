// Static match / target vocabulary the generator samples from
use std::fmt;

use crate::table::{BuiltinChain, TableKind};

/// One match specifier and the values it may take.
#[derive(Debug, PartialEq, Eq)]
pub struct MatchSpec {
    pub flag: &'static str,
    /// Extension module that must be loaded first, e.g. `-m mark`.
    pub module: Option<&'static str>,
    /// Empty for flags that take no value (`--syn`).
    pub values: &'static [&'static str],
}

// Split by protocol so a rule never mixes tcp and udp port matches.
pub const COMMON_MATCHES: &[MatchSpec] = &[
    MatchSpec {
        flag: "--mark",
        module: Some("-m mark"),
        values: &[
            "0x1/0xffff",
            "0x4000000/0xffff0000",
            "0x2/0xffff",
            "0x3/0xffff",
        ],
    },
    MatchSpec {
        flag: "--ctstate",
        module: Some("-m conntrack"),
        values: &["NEW", "ESTABLISHED", "DNAT", "SNAT"],
    },
    MatchSpec {
        flag: "-s",
        module: None,
        values: &[
            "192.168.1.0/24",
            "192.168.2.1",
            "192.168.1.3",
            "1.1.1.1",
            "8.8.8.8",
        ],
    },
    MatchSpec {
        flag: "-d",
        module: None,
        values: &[
            "8.8.8.8",
            "100.100.100.100",
            "192.168.1.3",
            "1.1.1.1",
            "2.2.2.2",
        ],
    },
    MatchSpec {
        flag: "-i",
        module: None,
        values: &["eth0", "eth1"],
    },
    MatchSpec {
        flag: "-o",
        module: None,
        values: &["eth0", "eth1"],
    },
];

pub const TCP_MATCHES: &[MatchSpec] = &[
    MatchSpec {
        flag: "--dport",
        module: None,
        values: &["9999", "80", "22"],
    },
    MatchSpec {
        flag: "--sport",
        module: None,
        values: &["9999", "80", "22"],
    },
    MatchSpec {
        flag: "--syn",
        module: None,
        values: &[],
    },
    MatchSpec {
        flag: "--tcp-flags",
        module: None,
        values: &["SYN,ACK,FIN SYN", "SYN,ACK ALL", "ALL NONE"],
    },
];

pub const UDP_MATCHES: &[MatchSpec] = &[
    MatchSpec {
        flag: "--dport",
        module: None,
        values: &["8081", "52", "1234"],
    },
    MatchSpec {
        flag: "--sport",
        module: None,
        values: &["8081", "52", "1234"],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }

    /// Common matches followed by the protocol-specific ones.
    pub fn match_pool(&self) -> Vec<&'static MatchSpec> {
        let specific = match self {
            Self::Tcp => TCP_MATCHES,
            Self::Udp => UDP_MATCHES,
        };
        COMMON_MATCHES.iter().chain(specific.iter()).collect()
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Jump targets. CONNMARK is split by mode because its modes differ in where they are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Accept,
    Drop,
    Ct,
    Mark,
    ConnmarkSave,
    ConnmarkRestore,
    ConnmarkSet,
    Snat,
    Dnat,
    Masquerade,
    Redirect,
}

impl TargetKind {
    /// Name as written after `-j`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Accept => "ACCEPT",
            Self::Drop => "DROP",
            Self::Ct => "CT",
            Self::Mark => "MARK",
            Self::ConnmarkSave | Self::ConnmarkRestore | Self::ConnmarkSet => "CONNMARK",
            Self::Snat => "SNAT",
            Self::Dnat => "DNAT",
            Self::Masquerade => "MASQUERADE",
            Self::Redirect => "REDIRECT",
        }
    }

    /// Argument strings for this target. `""` means no argument.
    pub fn arguments(&self) -> &'static [&'static str] {
        match self {
            Self::Accept | Self::Drop => &[""],
            Self::Ct => &["--notrack", "--zone 1", "--zone 2"],
            Self::Mark => &[
                "--set-xmark 0x1/0xffff",
                "--set-xmark 0x2/0xffff",
                "--set-mark 0x3/0xffff",
                "--set-mark 0x4/0xffff",
            ],
            Self::ConnmarkSave => &[
                "--save-mark --nfmask 0xffff000 --ctmask 0xffff0000",
                "--save-mark --nfmask 0x000ffff --ctmask 0x0000ffff",
            ],
            Self::ConnmarkRestore => &[
                "--restore-mark --nfmask 0xffff000 --ctmask 0xffff0000",
                "--restore-mark --nfmask 0x000ffff --ctmask 0x0000ffff",
            ],
            Self::ConnmarkSet => &["--set-mark 0x1/0xffff", "--set-xmark 0x4000000/0xffff0000"],
            Self::Snat => &[
                "--to-source 203.0.113.103",
                "--to-source 8.8.8.8",
                "--to-source 203.0.113.0/24",
                "--to-source 1.1.1.1",
            ],
            Self::Dnat => &[
                "--to-destination 192.168.1.0/24",
                "--to-destination 192.168.1.3",
                "--to-destination 192.168.1.2",
            ],
            Self::Masquerade => &[
                "",
                "--to-ports 50000-55000",
                "--to-ports 10000-15000",
                "--to-ports 80-1000",
            ],
            Self::Redirect => &["--to-ports 9697-10000", "--to-ports 80-81"],
        }
    }
}

/// What the generator emits for one table.
#[derive(Debug)]
pub struct TableProfile {
    pub table: TableKind,
    /// Chains generated when the configuration does not name any.
    pub chains: &'static [BuiltinChain],
    pub targets: &'static [TargetKind],
}

static PROFILES: [TableProfile; 4] = [
    TableProfile {
        table: TableKind::Raw,
        chains: &[BuiltinChain::Prerouting, BuiltinChain::Output],
        targets: &[TargetKind::Accept, TargetKind::Drop, TargetKind::Ct],
    },
    TableProfile {
        table: TableKind::Mangle,
        chains: &[BuiltinChain::Prerouting, BuiltinChain::Postrouting],
        targets: &[
            TargetKind::Mark,
            TargetKind::ConnmarkSave,
            TargetKind::ConnmarkRestore,
            TargetKind::ConnmarkSet,
        ],
    },
    TableProfile {
        table: TableKind::Nat,
        chains: &[BuiltinChain::Prerouting, BuiltinChain::Postrouting],
        targets: &[
            TargetKind::Snat,
            TargetKind::Dnat,
            TargetKind::Masquerade,
            TargetKind::Redirect,
        ],
    },
    TableProfile {
        table: TableKind::Filter,
        chains: &[BuiltinChain::Forward],
        targets: &[TargetKind::Accept, TargetKind::Drop],
    },
];

pub fn profile(table: TableKind) -> &'static TableProfile {
    match table {
        TableKind::Raw => &PROFILES[0],
        TableKind::Mangle => &PROFILES[1],
        TableKind::Nat => &PROFILES[2],
        TableKind::Filter => &PROFILES[3],
    }
}
