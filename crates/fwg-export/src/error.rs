use fwg_core::TableKind;
use std::path::PathBuf;
use thiserror::Error;

/// A malformed line in a rule-export file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: unknown record '{token}'")]
    UnknownRecord { line: usize, token: String },

    #[error("line {line}: {record} record is missing its {field}")]
    MissingField {
        line: usize,
        record: &'static str,
        field: &'static str,
    },

    #[error("line {line}: rule appended to undeclared chain '{chain}'")]
    UndeclaredChain { line: usize, chain: String },

    #[error("line {line}: chain '{chain}' declared twice")]
    DuplicateChain { line: usize, chain: String },

    #[error("line {line}: invalid policy '{value}'")]
    InvalidPolicy { line: usize, value: String },

    #[error("line {line}: empty rule appended to chain '{chain}'")]
    EmptyRule { line: usize, chain: String },

    #[error("line {line}: chain name '{chain}' contains ':', '<' or '>'")]
    InvalidChainName { line: usize, chain: String },

    #[error("line {line}: policy set on user-defined chain '{chain}'")]
    PolicyOnUserChain { line: usize, chain: String },
}

/// Failures of a whole conversion run.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("{}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("cannot tell which table {} holds (expected raw, mangle, nat or filter in the file name)", .path.display())]
    UnknownTable { path: PathBuf },

    #[error("both {} and {} resolve to table {table}", .first.display(), .second.display())]
    DuplicateTable {
        table: TableKind,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
