// Reader for `iptables -S` style exports: one file per table
use fwg_core::{BuiltinChain, Chain, Policy, Rule, Table, TableKind};
use tracing::debug;

use crate::error::ParseError;

/// One line of an export file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record<'a> {
    /// `-P <chain> <policy>`
    Policy { chain: &'a str, policy: Policy },
    /// `-N <chain>`
    NewChain { chain: &'a str },
    /// `-A <chain> <rule tokens...>`, tokens re-joined with single spaces
    Append { chain: &'a str, rule: String },
}

/// Parse a single line. Blank lines yield `None`.
pub fn parse_record(line: usize, text: &str) -> Result<Option<Record<'_>>, ParseError> {
    let mut tokens = text.split_whitespace();
    let Some(kind) = tokens.next() else {
        return Ok(None);
    };

    let record = match kind {
        "-P" => {
            let chain = chain_name(
                line,
                tokens.next().ok_or(ParseError::MissingField {
                    line,
                    record: "-P",
                    field: "chain",
                })?,
            )?;
            if chain.parse::<BuiltinChain>().is_err() {
                return Err(ParseError::PolicyOnUserChain {
                    line,
                    chain: chain.to_string(),
                });
            }
            let value = tokens.next().ok_or(ParseError::MissingField {
                line,
                record: "-P",
                field: "policy",
            })?;
            let policy = value.parse().map_err(|_| ParseError::InvalidPolicy {
                line,
                value: value.to_string(),
            })?;
            Record::Policy { chain, policy }
        }
        "-N" => {
            let chain = chain_name(
                line,
                tokens.next().ok_or(ParseError::MissingField {
                    line,
                    record: "-N",
                    field: "chain",
                })?,
            )?;
            Record::NewChain { chain }
        }
        "-A" => {
            let chain = chain_name(
                line,
                tokens.next().ok_or(ParseError::MissingField {
                    line,
                    record: "-A",
                    field: "chain",
                })?,
            )?;
            let rule = tokens.collect::<Vec<_>>().join(" ");
            if rule.is_empty() {
                return Err(ParseError::EmptyRule {
                    line,
                    chain: chain.to_string(),
                });
            }
            Record::Append { chain, rule }
        }
        other => {
            return Err(ParseError::UnknownRecord {
                line,
                token: other.to_string(),
            });
        }
    };

    Ok(Some(record))
}

// The notation brackets chain names and separates the policy with ':'.
fn chain_name(line: usize, name: &str) -> Result<&str, ParseError> {
    if name.contains([':', '<', '>']) {
        return Err(ParseError::InvalidChainName {
            line,
            chain: name.to_string(),
        });
    }
    Ok(name)
}

/// Build a table from the full text of its export file.
///
/// Chains must be declared (`-P` or `-N`) before rules are appended to them.
/// Rule bodies are kept verbatim; match and target tokens are not interpreted.
pub fn parse_table(kind: TableKind, text: &str) -> Result<Table, ParseError> {
    let mut table = Table::new(kind);

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let Some(record) = parse_record(line, raw)? else {
            continue;
        };

        match record {
            Record::Policy { chain, policy } => {
                declare(&mut table, Chain::with_policy(chain, policy), line)?;
            }
            Record::NewChain { chain } => {
                declare(&mut table, Chain::new(chain), line)?;
            }
            Record::Append { chain, rule } => {
                table
                    .chain_mut(chain)
                    .ok_or_else(|| ParseError::UndeclaredChain {
                        line,
                        chain: chain.to_string(),
                    })?
                    .push_rule(Rule::new(rule));
            }
        }
    }

    debug!(table = %kind, chains = table.chains.len(), rules = table.rule_count(), "parsed export");
    Ok(table)
}

fn declare(table: &mut Table, chain: Chain, line: usize) -> Result<(), ParseError> {
    table
        .add_chain(chain)
        .map(|_| ())
        .map_err(|e| ParseError::DuplicateChain { line, chain: e.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fwg_core::{Ruleset, parse_notation, render};
    use proptest::prelude::*;

    #[test]
    fn test_policy_and_append() {
        let table = parse_table(
            TableKind::Filter,
            "-P INPUT ACCEPT\n-A INPUT -p tcp --dport 22 -j ACCEPT\n",
        )
        .unwrap();

        assert_eq!(table.kind, TableKind::Filter);
        assert_eq!(table.chains.len(), 1);
        let input = table.chain("INPUT").unwrap();
        assert_eq!(input.policy, Some(Policy::Accept));
        assert_eq!(input.rules, vec![Rule::new("-p tcp --dport 22 -j ACCEPT")]);

        let mut ruleset = Ruleset::new();
        ruleset.add_table(table).unwrap();
        assert_eq!(
            render(&ruleset),
            "<<filter>>\n\t<INPUT:ACCEPT>\n\t\t-p tcp --dport 22 -j ACCEPT\n"
        );
    }

    #[test]
    fn test_user_chain_without_rules() {
        let table = parse_table(TableKind::Filter, "-P FORWARD DROP\n-N LOGGING\n").unwrap();
        let mut ruleset = Ruleset::new();
        ruleset.add_table(table).unwrap();
        assert_eq!(
            render(&ruleset),
            "<<filter>>\n\t<FORWARD:DROP>\n\t<LOGGING>\n"
        );
    }

    #[test]
    fn test_rule_order_preserved() {
        let text = "-N CUSTOM\n-A CUSTOM -s 1.1.1.1 -j DROP\n-P INPUT DROP\n-A CUSTOM -j ACCEPT\n-A INPUT -j CUSTOM\n";
        let table = parse_table(TableKind::Filter, text).unwrap();
        let names: Vec<_> = table.chains.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["CUSTOM", "INPUT"]);
        let custom = table.chain("CUSTOM").unwrap();
        assert_eq!(
            custom.rules,
            vec![Rule::new("-s 1.1.1.1 -j DROP"), Rule::new("-j ACCEPT")]
        );
        assert_eq!(custom.policy, None);
    }

    #[test]
    fn test_whitespace_is_normalised() {
        let table = parse_table(
            TableKind::Nat,
            "\n-N  POST\n\n-A POST\t-o eth0   -j MASQUERADE  \n",
        )
        .unwrap();
        assert_eq!(
            table.chain("POST").unwrap().rules,
            vec![Rule::new("-o eth0 -j MASQUERADE")]
        );
    }

    #[test]
    fn test_undeclared_chain() {
        let err = parse_table(TableKind::Filter, "-A INPUT -j ACCEPT\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::UndeclaredChain {
                line: 1,
                chain: "INPUT".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_record() {
        let err = parse_table(TableKind::Filter, "-P INPUT ACCEPT\n-X INPUT\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownRecord {
                line: 2,
                token: "-X".to_string()
            }
        );
        // iptables-save syntax is a different dialect
        assert!(parse_table(TableKind::Filter, "*filter\n").is_err());
    }

    #[test]
    fn test_malformed_records() {
        assert!(matches!(
            parse_table(TableKind::Filter, "-P INPUT\n"),
            Err(ParseError::MissingField { field: "policy", .. })
        ));
        assert!(matches!(
            parse_table(TableKind::Filter, "-N\n"),
            Err(ParseError::MissingField { record: "-N", .. })
        ));
        assert!(matches!(
            parse_table(TableKind::Filter, "-A\n"),
            Err(ParseError::MissingField { record: "-A", .. })
        ));
        assert!(matches!(
            parse_table(TableKind::Filter, "-N X\n-A X\n"),
            Err(ParseError::EmptyRule { line: 2, .. })
        ));
        assert!(matches!(
            parse_table(TableKind::Filter, "-P INPUT REJECT\n"),
            Err(ParseError::InvalidPolicy { .. })
        ));
        assert!(matches!(
            parse_table(TableKind::Filter, "-P INPUT DROP\n-N INPUT\n"),
            Err(ParseError::DuplicateChain { line: 2, .. })
        ));
    }

    #[test]
    fn test_chain_names_must_fit_the_notation() {
        for text in [
            "-N a:DROP\n-A a:DROP -j ACCEPT\n",
            "-N a:b\n",
            "-N <x>\n",
            "-P INPUT:DROP ACCEPT\n",
        ] {
            assert!(
                matches!(
                    parse_table(TableKind::Filter, text),
                    Err(ParseError::InvalidChainName { line: 1, .. })
                ),
                "{:?}",
                text
            );
        }
        assert_eq!(
            parse_table(TableKind::Filter, "-N X\n-A X:Y -j DROP\n").unwrap_err(),
            ParseError::InvalidChainName {
                line: 2,
                chain: "X:Y".to_string()
            }
        );
    }

    #[test]
    fn test_policy_only_on_builtin_chains() {
        let err = parse_table(TableKind::Filter, "-P CUSTOM ACCEPT\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::PolicyOnUserChain {
                line: 1,
                chain: "CUSTOM".to_string()
            }
        );

        let nat = parse_table(TableKind::Nat, "-P PREROUTING ACCEPT\n-P OUTPUT DROP\n").unwrap();
        assert_eq!(nat.chains.len(), 2);
    }

    // Includes the characters the notation reserves, so rejection is exercised too.
    fn arb_chain_name() -> impl Strategy<Value = String> {
        prop_oneof![
            3 => "[A-Za-z][A-Za-z0-9_-]{0,10}",
            1 => "[a-z:<>]{1,6}",
            1 => prop::sample::select(BuiltinChain::ALL.map(|c| c.as_str().to_string()).to_vec()),
        ]
    }

    fn is_notation_safe(name: &str) -> bool {
        !name.contains([':', '<', '>'])
    }

    fn arb_rule() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-z0-9!,./-]{1,12}", 1..6).prop_map(|tokens| tokens.join(" "))
    }

    fn arb_export() -> impl Strategy<Value = String> {
        prop::collection::vec(
            (arb_chain_name(), any::<Option<bool>>(), prop::collection::vec(arb_rule(), 0..4)),
            0..5,
        )
        .prop_map(|chains| {
            let mut seen = std::collections::HashSet::new();
            let mut lines = vec![];
            for (name, policy, rules) in chains {
                if !seen.insert(name.clone()) {
                    continue;
                }
                let builtin = name.parse::<BuiltinChain>().is_ok();
                match policy {
                    Some(true) if builtin => lines.push(format!("-P {} ACCEPT", name)),
                    Some(false) if builtin => lines.push(format!("-P {} DROP", name)),
                    _ => lines.push(format!("-N {}", name)),
                }
                for rule in rules {
                    lines.push(format!("-A {} {}", name, rule));
                }
            }
            lines.join("\n")
        })
    }

    proptest! {
        #[test]
        fn prop_notation_round_trip(export in arb_export()) {
            let parsed = parse_table(TableKind::Mangle, &export);
            let safe = export
                .lines()
                .all(|line| line.split_whitespace().nth(1).is_some_and(is_notation_safe));
            if !safe {
                prop_assert!(
                    matches!(parsed, Err(ParseError::InvalidChainName { .. })),
                    "expected rejection, got {:?}",
                    parsed
                );
                return Ok(());
            }

            let mut model = Ruleset::new();
            model.add_table(parsed.unwrap()).unwrap();

            let once = render(&model);
            let reparsed = parse_notation(&once).unwrap();
            prop_assert_eq!(render(&reparsed), once);
            prop_assert_eq!(reparsed, model);
        }
    }
}
