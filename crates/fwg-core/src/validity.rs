//! Where a match or a target may legally appear.
//!
//! Both predicates are driven by the lookup tables below and nothing else.

use crate::catalog::{self, TargetKind};
use crate::table::{BuiltinChain, TableKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ingress,
    Egress,
}

impl Direction {
    /// Chains that see traffic in this direction. Input/forward and
    /// pre-routing see inbound packets, output/forward and post-routing outbound.
    pub fn chains(&self) -> &'static [BuiltinChain] {
        match self {
            Self::Ingress => &[
                BuiltinChain::Prerouting,
                BuiltinChain::Input,
                BuiltinChain::Forward,
            ],
            Self::Egress => &[
                BuiltinChain::Forward,
                BuiltinChain::Output,
                BuiltinChain::Postrouting,
            ],
        }
    }
}

const INTERFACE_MATCHES: &[(&str, Direction)] = &[("-i", Direction::Ingress), ("-o", Direction::Egress)];

// Targets absent from this table are legal on every chain of their table.
const RESTRICTED_TARGETS: &[(TargetKind, &[BuiltinChain])] = &[
    (TargetKind::Snat, &[BuiltinChain::Postrouting]),
    (TargetKind::Masquerade, &[BuiltinChain::Postrouting]),
    (
        TargetKind::Dnat,
        &[BuiltinChain::Prerouting, BuiltinChain::Output],
    ),
    (
        TargetKind::Redirect,
        &[BuiltinChain::Prerouting, BuiltinChain::Output],
    ),
    (TargetKind::ConnmarkSet, &[BuiltinChain::Prerouting]),
];

pub fn direction_of(flag: &str) -> Option<Direction> {
    INTERFACE_MATCHES
        .iter()
        .find(|(f, _)| *f == flag)
        .map(|(_, direction)| *direction)
}

/// Interface matches only make sense on chains that see that direction of traffic.
pub fn is_valid_match(flag: &str, _table: TableKind, chain: BuiltinChain) -> bool {
    match direction_of(flag) {
        Some(direction) => direction.chains().contains(&chain),
        None => true,
    }
}

pub fn is_valid_target(target: TargetKind, table: TableKind, chain: BuiltinChain) -> bool {
    if !table.permits(chain) || !catalog::profile(table).targets.contains(&target) {
        return false;
    }

    RESTRICTED_TARGETS
        .iter()
        .find(|(restricted, _)| *restricted == target)
        .map(|(_, chains)| chains.contains(&chain))
        .unwrap_or(true)
}

/// The table's targets that are legal on `chain`, in catalog order.
pub fn valid_targets(table: TableKind, chain: BuiltinChain) -> Vec<TargetKind> {
    catalog::profile(table)
        .targets
        .iter()
        .copied()
        .filter(|target| is_valid_target(*target, table, chain))
        .collect()
}
