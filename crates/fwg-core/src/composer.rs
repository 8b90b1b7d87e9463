use rand::Rng;
use rand::seq::{SliceRandom, index};
use std::fmt;
use std::ops::RangeInclusive;
use tracing::debug;

use crate::catalog::{Protocol, TargetKind};
use crate::error::GenerationError;
use crate::table::{BuiltinChain, Rule, TableKind};
use crate::validity::{is_valid_match, valid_targets};

pub const DEFAULT_MATCHES_PER_RULE: RangeInclusive<usize> = 1..=4;
pub const DEFAULT_NEGATION_PROBABILITY: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub module: Option<&'static str>,
    pub flag: &'static str,
    pub value: Option<&'static str>,
    pub negated: bool,
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(module) = self.module {
            write!(f, "{} ", module)?;
        }
        if self.negated {
            f.write_str("! ")?;
        }
        f.write_str(self.flag)?;
        if let Some(value) = self.value {
            write!(f, " {}", value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub kind: TargetKind,
    pub argument: &'static str,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-j {}", self.kind.name())?;
        if !self.argument.is_empty() {
            write!(f, " {}", self.argument)?;
        }
        Ok(())
    }
}

/// A generated rule before it is flattened into notation text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedRule {
    pub protocol: Protocol,
    pub matches: Vec<Match>,
    pub target: Target,
}

impl fmt::Display for ComposedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-p {}", self.protocol)?;
        for m in &self.matches {
            write!(f, " {}", m)?;
        }
        write!(f, " {}", self.target)
    }
}

impl From<&ComposedRule> for Rule {
    fn from(rule: &ComposedRule) -> Self {
        Rule::new(rule.to_string())
    }
}

/// Builds single rules for a (table, chain) pair.
#[derive(Debug, Clone)]
pub struct RuleComposer {
    matches_per_rule: RangeInclusive<usize>,
    negation_probability: f64,
}

impl RuleComposer {
    pub fn new(
        matches_per_rule: RangeInclusive<usize>,
        negation_probability: f64,
    ) -> Result<Self, GenerationError> {
        let (min, max) = (*matches_per_rule.start(), *matches_per_rule.end());
        if min == 0 || min > max {
            return Err(GenerationError::InvalidMatchRange { min, max });
        }
        if !(0.0..=1.0).contains(&negation_probability) {
            return Err(GenerationError::InvalidNegationProbability(
                negation_probability,
            ));
        }

        Ok(Self {
            matches_per_rule,
            negation_probability,
        })
    }

    /// Compose one rule.
    ///
    /// Sampled matches that are illegal on `chain` are dropped rather than
    /// replaced, so a rule can carry fewer matches than were drawn, zero
    /// included. Downstream consumers rely on that distribution.
    ///
    /// The target is drawn uniformly from the targets legal on `chain`; an
    /// empty set is reported as [`GenerationError::NoValidTarget`].
    pub fn compose<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        table: TableKind,
        chain: BuiltinChain,
    ) -> Result<ComposedRule, GenerationError> {
        if !table.permits(chain) {
            return Err(GenerationError::ChainNotInTable { table, chain });
        }
        let targets = valid_targets(table, chain);
        if targets.is_empty() {
            return Err(GenerationError::NoValidTarget { table, chain });
        }

        let protocol = if rng.gen_bool(0.5) {
            Protocol::Tcp
        } else {
            Protocol::Udp
        };

        let pool = protocol.match_pool();
        let count = rng.gen_range(self.matches_per_rule.clone()).min(pool.len());

        let mut matches = Vec::with_capacity(count);
        for idx in index::sample(rng, pool.len(), count).iter() {
            let spec = pool[idx];
            if !is_valid_match(spec.flag, table, chain) {
                debug!(flag = spec.flag, %table, %chain, "dropping match not valid on chain");
                continue;
            }

            let negated = rng.gen_bool(self.negation_probability);
            let value = spec.values.choose(rng).copied();
            matches.push(Match {
                module: spec.module,
                flag: spec.flag,
                value,
                negated,
            });
        }

        // non-empty, checked above
        let kind = targets[rng.gen_range(0..targets.len())];
        let argument = kind.arguments().choose(rng).copied().unwrap_or_default();

        Ok(ComposedRule {
            protocol,
            matches,
            target: Target { kind, argument },
        })
    }
}

impl Default for RuleComposer {
    fn default() -> Self {
        Self {
            matches_per_rule: DEFAULT_MATCHES_PER_RULE,
            negation_probability: DEFAULT_NEGATION_PROBABILITY,
        }
    }
}
