use anyhow::Result;
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::composer::RuleComposer;
use crate::config::TableSelection;
use crate::error::GenerationError;
use crate::notation;
use crate::output::write_atomic;
use crate::table::{BuiltinChain, Chain, Policy, Rule, Ruleset, Table, TableKind};

/// Fills whole tables with composed rules.
#[derive(Debug, Clone, Default)]
pub struct TableGenerator {
    composer: RuleComposer,
}

impl TableGenerator {
    pub fn new(composer: RuleComposer) -> Self {
        Self { composer }
    }

    /// Generate `rule_count` rules for each of `chains`, in order.
    ///
    /// Filter chains get a default policy picked uniformly between ACCEPT and DROP
    /// before their rules are drawn; chains of the other tables carry none.
    pub fn generate_table<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        table: TableKind,
        chains: &[BuiltinChain],
        rule_count: usize,
    ) -> Result<Table, GenerationError> {
        let mut generated = Table::new(table);

        for &chain in chains {
            let mut entry = if table.has_policy() {
                let policy = if rng.gen_bool(0.5) {
                    Policy::Accept
                } else {
                    Policy::Drop
                };
                Chain::with_policy(chain.as_str(), policy)
            } else {
                Chain::new(chain.as_str())
            };

            for _ in 0..rule_count {
                let rule = self.composer.compose(rng, table, chain)?;
                entry.push_rule(Rule::from(&rule));
            }

            generated
                .add_chain(entry)
                .map_err(|_| GenerationError::RepeatedChain { table, chain })?;
        }

        debug!(%table, chains = chains.len(), rules = generated.rule_count(), "generated table");
        Ok(generated)
    }

    /// One chain set: every selected table, in selection order.
    pub fn generate_ruleset<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        selections: &[TableSelection],
        rule_count: usize,
    ) -> Result<Ruleset, GenerationError> {
        let mut ruleset = Ruleset::new();
        for selection in selections {
            let table = self.generate_table(rng, selection.table, selection.chains(), rule_count)?;
            ruleset
                .add_table(table)
                .map_err(|e| GenerationError::RepeatedTable(e.0))?;
        }
        Ok(ruleset)
    }

    /// Generate `set_count` chain sets and write each to its own file under
    /// `<root>/<rule_count>/`. Returns the written paths in index order.
    pub fn write_chain_sets<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        selections: &[TableSelection],
        root: &Path,
        set_count: usize,
        rule_count: usize,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(set_count);

        for index in 0..set_count {
            let ruleset = self.generate_ruleset(rng, selections, rule_count)?;
            let path = chain_set_path(root, rule_count, index);
            write_atomic(&path, &notation::render(&ruleset))?;
            info!(path = %path.display(), "wrote chain set");
            written.push(path);
        }

        Ok(written)
    }
}

/// `<root>/<rule_count>/_gen<index>`
pub fn chain_set_path(root: &Path, rule_count: usize, index: usize) -> PathBuf {
    root.join(rule_count.to_string())
        .join(format!("_gen{}", index))
}
