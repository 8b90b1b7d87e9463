pub mod catalog;
pub mod composer;
pub mod config;
pub mod error;
pub mod generator;
pub mod notation;
pub mod output;
pub mod table;
pub mod validity;

pub use catalog::{MatchSpec, Protocol, TableProfile, TargetKind};
pub use composer::{ComposedRule, Match, RuleComposer, Target};
pub use config::{GeneratorConfig, MatchRange, TableSelection};
pub use error::{GenerationError, NotationError};
pub use generator::{TableGenerator, chain_set_path};
pub use notation::{parse_notation, render};
pub use output::write_atomic;
pub use table::{BuiltinChain, Chain, Policy, Rule, Ruleset, Table, TableKind};
pub use validity::{is_valid_match, is_valid_target, valid_targets};
