use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::catalog;
use crate::composer::{DEFAULT_MATCHES_PER_RULE, DEFAULT_NEGATION_PROBABILITY, RuleComposer};
use crate::error::GenerationError;
use crate::table::{BuiltinChain, TableKind};
use crate::validity::valid_targets;

pub const DEFAULT_OUTPUT_ROOT: &str = "data/generated";

/// Generator settings, usually loaded from YAML.
///
/// ```yaml
/// output_root: data/generated
/// matches_per_rule: { min: 1, max: 4 }
/// negation_probability: 0.3
/// seed: 1234
/// tables:
///   - table: filter
///   - table: nat
///     chains: [PREROUTING, POSTROUTING]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    #[serde(default)]
    pub matches_per_rule: MatchRange,
    #[serde(default = "default_negation_probability")]
    pub negation_probability: f64,
    #[serde(default = "default_tables")]
    pub tables: Vec<TableSelection>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRange {
    pub min: usize,
    pub max: usize,
}

impl Default for MatchRange {
    fn default() -> Self {
        Self {
            min: *DEFAULT_MATCHES_PER_RULE.start(),
            max: *DEFAULT_MATCHES_PER_RULE.end(),
        }
    }
}

/// A table to generate and, optionally, the chains to generate for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSelection {
    pub table: TableKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chains: Option<Vec<BuiltinChain>>,
}

impl TableSelection {
    pub fn new(table: TableKind) -> Self {
        Self {
            table,
            chains: None,
        }
    }

    /// Configured chains, or the table's default generation topology.
    pub fn chains(&self) -> &[BuiltinChain] {
        self.chains
            .as_deref()
            .unwrap_or(catalog::profile(self.table).chains)
    }
}

fn default_output_root() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_ROOT)
}

fn default_negation_probability() -> f64 {
    DEFAULT_NEGATION_PROBABILITY
}

fn default_tables() -> Vec<TableSelection> {
    vec![TableSelection::new(TableKind::Filter)]
}

impl GeneratorConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read generator config from {:?}", path))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse generator config {:?}", path))
    }

    /// Reject settings that could never produce a valid chain set.
    ///
    /// A chain without any legal target is reported here, before anything is
    /// written, instead of failing halfway through a run.
    pub fn validate(&self) -> Result<(), GenerationError> {
        self.composer()?;

        let mut seen_tables = HashSet::new();
        for selection in &self.tables {
            let table = selection.table;
            if !seen_tables.insert(table) {
                return Err(GenerationError::RepeatedTable(table));
            }

            let mut seen_chains = HashSet::new();
            for &chain in selection.chains() {
                if !seen_chains.insert(chain) {
                    return Err(GenerationError::RepeatedChain { table, chain });
                }
                if !table.permits(chain) {
                    return Err(GenerationError::ChainNotInTable { table, chain });
                }
                if valid_targets(table, chain).is_empty() {
                    return Err(GenerationError::NoValidTarget { table, chain });
                }
            }
        }

        Ok(())
    }

    pub fn composer(&self) -> Result<RuleComposer, GenerationError> {
        RuleComposer::new(
            self.matches_per_rule.min..=self.matches_per_rule.max,
            self.negation_probability,
        )
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            matches_per_rule: MatchRange::default(),
            negation_probability: default_negation_probability(),
            tables: default_tables(),
            seed: None,
        }
    }
}
