//! The internal rule-set notation.
//!
//! ```text
//! <<filter>>
//! 	<INPUT:ACCEPT>
//! 		-p tcp --dport 22 -j ACCEPT
//! 	<LOGGING>
//! ```
//!
//! A table header, then per chain a header indented by one tab and its rules
//! indented by two. Every line ends with a newline.

use std::fmt::Write;

use crate::error::NotationError;
use crate::table::{Chain, Policy, Rule, Ruleset, Table, TableKind};

/// Render tables, chains and rules in the order they are stored.
pub fn render(ruleset: &Ruleset) -> String {
    let mut out = String::new();
    for table in &ruleset.tables {
        render_table(&mut out, table);
    }
    out
}

fn render_table(out: &mut String, table: &Table) {
    // writing into a String cannot fail
    let _ = writeln!(out, "<<{}>>", table.kind);
    for chain in &table.chains {
        match chain.policy {
            Some(policy) => {
                let _ = writeln!(out, "\t<{}:{}>", chain.name, policy);
            }
            None => {
                let _ = writeln!(out, "\t<{}>", chain.name);
            }
        }
        for rule in &chain.rules {
            let _ = writeln!(out, "\t\t{}", rule);
        }
    }
}

/// Read notation produced by [`render`] back into a ruleset.
pub fn parse_notation(text: &str) -> Result<Ruleset, NotationError> {
    let mut ruleset = Ruleset::new();
    // index of the chain receiving rules, within the last table
    let mut current_chain: Option<usize> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }

        if let Some(rule) = raw.strip_prefix("\t\t") {
            match (current_chain, ruleset.tables.last_mut()) {
                (Some(i), Some(table)) => table.chains[i].push_rule(Rule::new(rule)),
                _ => return Err(NotationError::RuleOutsideChain { line }),
            }
        } else if let Some(header) = raw.strip_prefix('\t') {
            let chain = parse_chain_header(header, line)?;
            let table = ruleset
                .tables
                .last_mut()
                .ok_or(NotationError::ChainOutsideTable { line })?;
            table
                .add_chain(chain)
                .map_err(|source| NotationError::DuplicateChain { line, source })?;
            current_chain = Some(table.chains.len() - 1);
        } else {
            let name = raw
                .strip_prefix("<<")
                .and_then(|rest| rest.strip_suffix(">>"))
                .ok_or_else(|| malformed(line, raw))?;
            let kind: TableKind = name
                .parse()
                .map_err(|source| NotationError::UnknownName { line, source })?;
            ruleset
                .add_table(Table::new(kind))
                .map_err(|source| NotationError::DuplicateTable { line, source })?;
            current_chain = None;
        }
    }

    Ok(ruleset)
}

fn parse_chain_header(header: &str, line: usize) -> Result<Chain, NotationError> {
    let inner = header
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
        .filter(|inner| !inner.is_empty())
        .ok_or_else(|| malformed(line, header))?;

    match inner.rsplit_once(':') {
        Some((name, policy)) => {
            let policy: Policy = policy
                .parse()
                .map_err(|source| NotationError::UnknownName { line, source })?;
            Ok(Chain::with_policy(name, policy))
        }
        None => Ok(Chain::new(inner)),
    }
}

fn malformed(line: usize, text: &str) -> NotationError {
    NotationError::Malformed {
        line,
        text: text.to_string(),
    }
}
