// Table / chain / rule structural model shared by the generator and the converter
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{DuplicateChain, DuplicateTable, UnknownName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Raw,
    Mangle,
    Nat,
    Filter,
}

impl TableKind {
    /// Every table, in file-name resolution priority order.
    pub const ALL: [TableKind; 4] = [
        TableKind::Raw,
        TableKind::Mangle,
        TableKind::Nat,
        TableKind::Filter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Mangle => "mangle",
            Self::Nat => "nat",
            Self::Filter => "filter",
        }
    }

    /// Resolve a table from a file name by substring search.
    ///
    /// The first table in [`TableKind::ALL`] whose name occurs in `name` wins, so
    /// `"nat-filter.rules"` resolves to `nat`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|table| name.contains(table.as_str()))
    }

    /// Built-in chains this table can hold.
    pub fn builtin_chains(&self) -> &'static [BuiltinChain] {
        use BuiltinChain::*;
        match self {
            Self::Raw => &[Prerouting, Output],
            Self::Mangle => &[Prerouting, Input, Forward, Output, Postrouting],
            Self::Nat => &[Prerouting, Input, Output, Postrouting],
            Self::Filter => &[Input, Forward, Output],
        }
    }

    pub fn permits(&self, chain: BuiltinChain) -> bool {
        self.builtin_chains().contains(&chain)
    }

    /// Only filtering chains carry a default policy in the notation.
    pub fn has_policy(&self) -> bool {
        matches!(self, Self::Filter)
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableKind {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|table| table.as_str() == s)
            .ok_or_else(|| UnknownName::new("table", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuiltinChain {
    Prerouting,
    Input,
    Forward,
    Output,
    Postrouting,
}

impl BuiltinChain {
    pub const ALL: [BuiltinChain; 5] = [
        BuiltinChain::Prerouting,
        BuiltinChain::Input,
        BuiltinChain::Forward,
        BuiltinChain::Output,
        BuiltinChain::Postrouting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prerouting => "PREROUTING",
            Self::Input => "INPUT",
            Self::Forward => "FORWARD",
            Self::Output => "OUTPUT",
            Self::Postrouting => "POSTROUTING",
        }
    }
}

impl fmt::Display for BuiltinChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuiltinChain {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|chain| chain.as_str() == s)
            .ok_or_else(|| UnknownName::new("chain", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Accept,
    Drop,
}

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "ACCEPT",
            Self::Drop => "DROP",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACCEPT" => Ok(Self::Accept),
            "DROP" => Ok(Self::Drop),
            other => Err(UnknownName::new("policy", other)),
        }
    }
}

/// A rule as it appears in the notation: match and target tokens, space separated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub text: String,
}

impl Rule {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub name: String,
    pub policy: Option<Policy>,
    pub rules: Vec<Rule>,
}

impl Chain {
    /// Built-in chain carrying a default policy.
    pub fn with_policy(name: impl Into<String>, policy: Policy) -> Self {
        Self {
            name: name.into(),
            policy: Some(policy),
            rules: vec![],
        }
    }

    /// Chain without a policy (user-defined, or a built-in chain outside filter).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policy: None,
            rules: vec![],
        }
    }

    pub fn push_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub kind: TableKind,
    pub chains: Vec<Chain>,
}

impl Table {
    pub fn new(kind: TableKind) -> Self {
        Self {
            kind,
            chains: vec![],
        }
    }

    pub fn chain(&self, name: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.name == name)
    }

    pub fn chain_mut(&mut self, name: &str) -> Option<&mut Chain> {
        self.chains.iter_mut().find(|c| c.name == name)
    }

    /// Append a chain, keeping declaration order. Chain names are unique per table.
    pub fn add_chain(&mut self, chain: Chain) -> Result<&mut Chain, DuplicateChain> {
        if self.chain(&chain.name).is_some() {
            return Err(DuplicateChain(chain.name));
        }
        let index = self.chains.len();
        self.chains.push(chain);
        Ok(&mut self.chains[index])
    }

    pub fn rule_count(&self) -> usize {
        self.chains.iter().map(|c| c.rules.len()).sum()
    }
}

/// Tables in the order they were populated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ruleset {
    pub tables: Vec<Table>,
}

impl Ruleset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, kind: TableKind) -> Option<&Table> {
        self.tables.iter().find(|t| t.kind == kind)
    }

    pub fn add_table(&mut self, table: Table) -> Result<&mut Table, DuplicateTable> {
        if self.table(table.kind).is_some() {
            return Err(DuplicateTable(table.kind));
        }
        let index = self.tables.len();
        self.tables.push(table);
        Ok(&mut self.tables[index])
    }
}

impl fmt::Display for Ruleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::notation::render(self))
    }
}
