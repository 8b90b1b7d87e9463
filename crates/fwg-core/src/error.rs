use thiserror::Error;

use crate::table::{BuiltinChain, TableKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownName {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownName {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("chain '{0}' is already declared")]
pub struct DuplicateChain(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("table '{0}' is already declared")]
pub struct DuplicateTable(pub TableKind);

/// Failures while composing or generating rules.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// No target of the table's vocabulary is legal on this chain.
    #[error("no valid target for chain {chain} in table {table}")]
    NoValidTarget {
        table: TableKind,
        chain: BuiltinChain,
    },

    #[error("chain {chain} does not exist in table {table}")]
    ChainNotInTable {
        table: TableKind,
        chain: BuiltinChain,
    },

    #[error("chain {chain} is listed twice for table {table}")]
    RepeatedChain {
        table: TableKind,
        chain: BuiltinChain,
    },

    #[error("table {0} is listed twice")]
    RepeatedTable(TableKind),

    #[error("invalid matches-per-rule range [{min}, {max}]")]
    InvalidMatchRange { min: usize, max: usize },

    #[error("negation probability {0} is outside [0, 1]")]
    InvalidNegationProbability(f64),
}

/// Failures while reading the internal notation back into a ruleset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotationError {
    #[error("line {line}: malformed line '{text}'")]
    Malformed { line: usize, text: String },

    #[error("line {line}: {source}")]
    UnknownName {
        line: usize,
        #[source]
        source: UnknownName,
    },

    #[error("line {line}: chain header before any table header")]
    ChainOutsideTable { line: usize },

    #[error("line {line}: rule before any chain header")]
    RuleOutsideChain { line: usize },

    #[error("line {line}: {source}")]
    DuplicateChain {
        line: usize,
        #[source]
        source: DuplicateChain,
    },

    #[error("line {line}: {source}")]
    DuplicateTable {
        line: usize,
        #[source]
        source: DuplicateTable,
    },
}
