use anyhow::{Context, Result};
use fwg_core::{Ruleset, TableKind, notation, write_atomic};
use similar::TextDiff;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ConvertError;
use crate::parser::parse_table;

pub const DEFAULT_OUTPUT: &str = "data/converted/ruleset.conf";

/// A fresh conversion set against whatever currently sits at the output path.
#[derive(Debug)]
pub struct OutputCheck {
    pub output: PathBuf,
    /// `None` when the output file does not exist yet.
    pub existing: Option<String>,
    pub converted: String,
}

impl OutputCheck {
    pub fn is_current(&self) -> bool {
        self.existing.as_deref() == Some(self.converted.as_str())
    }

    /// Unified diff from the existing output to the fresh conversion, if they differ.
    pub fn diff(&self) -> Option<String> {
        if self.is_current() {
            return None;
        }
        let existing = self.existing.as_deref().unwrap_or("");
        let name = self.output.display().to_string();
        let diff = TextDiff::from_lines(existing, self.converted.as_str())
            .unified_diff()
            .context_radius(2)
            .header(&name, &format!("{} (converted)", name))
            .to_string();
        Some(diff)
    }
}

/// Converts per-table export files into one notation file.
pub struct Converter;

impl Converter {
    pub fn new() -> Self {
        Self
    }

    /// Pair each input with its table, in raw, mangle, nat, filter order.
    ///
    /// Only the file name is searched, so directories named after a table do
    /// not influence resolution.
    pub fn resolve_inputs(
        &self,
        inputs: &[PathBuf],
    ) -> Result<Vec<(TableKind, PathBuf)>, ConvertError> {
        let mut resolved: Vec<(TableKind, PathBuf)> = Vec::with_capacity(inputs.len());

        for path in inputs {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default();
            let table = TableKind::from_file_name(&file_name)
                .ok_or_else(|| ConvertError::UnknownTable { path: path.clone() })?;

            if let Some((_, first)) = resolved.iter().find(|(kind, _)| *kind == table) {
                return Err(ConvertError::DuplicateTable {
                    table,
                    first: first.clone(),
                    second: path.clone(),
                });
            }
            resolved.push((table, path.clone()));
        }

        resolved.sort_by_key(|(table, _)| *table);
        Ok(resolved)
    }

    /// Read and parse every input. Fails on the first bad file.
    pub fn convert(&self, inputs: &[PathBuf]) -> Result<Ruleset, ConvertError> {
        let mut ruleset = Ruleset::new();

        for (table, path) in self.resolve_inputs(inputs)? {
            let text = std::fs::read_to_string(&path).map_err(|source| ConvertError::Io {
                path: path.clone(),
                source,
            })?;
            let parsed = parse_table(table, &text).map_err(|source| ConvertError::Parse {
                path: path.clone(),
                source,
            })?;
            info!(%table, path = %path.display(), rules = parsed.rule_count(), "parsed table");

            // resolve_inputs already rejected duplicates
            ruleset.tables.push(parsed);
        }

        Ok(ruleset)
    }

    /// Convert and write the notation to `output`.
    ///
    /// Everything is parsed before the output is touched, so a parse error
    /// leaves no output file behind.
    pub fn convert_to_file(&self, inputs: &[PathBuf], output: &Path) -> Result<Ruleset> {
        let ruleset = self.convert(inputs)?;
        write_atomic(output, &notation::render(&ruleset))
            .with_context(|| format!("Failed to write converted ruleset to {:?}", output))?;
        info!(path = %output.display(), tables = ruleset.tables.len(), "wrote converted ruleset");
        Ok(ruleset)
    }

    /// Convert and compare with what is currently at `output`, without writing.
    pub fn check(&self, inputs: &[PathBuf], output: &Path) -> Result<OutputCheck> {
        let converted = notation::render(&self.convert(inputs)?);
        let existing = if output.exists() {
            Some(
                std::fs::read_to_string(output)
                    .with_context(|| format!("Failed to read existing output {:?}", output))?,
            )
        } else {
            None
        };

        Ok(OutputCheck {
            output: output.to_path_buf(),
            existing,
            converted,
        })
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_resolution_order_is_input_independent() {
        let converter = Converter::new();
        let inputs = vec![
            PathBuf::from("dump/filter.rules"),
            PathBuf::from("dump/nat.rules"),
            PathBuf::from("dump/raw.rules"),
            PathBuf::from("dump/mangle.rules"),
        ];

        let resolved = converter.resolve_inputs(&inputs).unwrap();
        let tables: Vec<_> = resolved.iter().map(|(t, _)| *t).collect();
        assert_eq!(tables, TableKind::ALL.to_vec());
        assert_eq!(resolved[0].1, PathBuf::from("dump/raw.rules"));
    }

    #[test]
    fn test_directory_names_are_ignored() {
        let converter = Converter::new();
        let resolved = converter
            .resolve_inputs(&[PathBuf::from("/home/natalie/filter.txt")])
            .unwrap();
        assert_eq!(resolved[0].0, TableKind::Filter);
    }

    #[test]
    fn test_resolution_errors() {
        let converter = Converter::new();
        assert!(matches!(
            converter.resolve_inputs(&[PathBuf::from("rules.txt")]),
            Err(ConvertError::UnknownTable { .. })
        ));
        assert!(matches!(
            converter.resolve_inputs(&[PathBuf::from("nat.a"), PathBuf::from("nat.b")]),
            Err(ConvertError::DuplicateTable {
                table: TableKind::Nat,
                ..
            })
        ));
    }

    #[test]
    fn test_convert_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let filter = write(
            &dir,
            "filter.rules",
            "-P INPUT ACCEPT\n-A INPUT -p tcp --dport 22 -j ACCEPT\n",
        );
        let nat = write(
            &dir,
            "nat.rules",
            "-P POSTROUTING ACCEPT\n-A POSTROUTING -o eth0 -j MASQUERADE\n",
        );
        let output = dir.path().join("out/ruleset.conf");

        let converter = Converter::new();
        converter
            .convert_to_file(&[filter, nat], &output)
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "<<nat>>\n\t<POSTROUTING:ACCEPT>\n\t\t-o eth0 -j MASQUERADE\n\
             <<filter>>\n\t<INPUT:ACCEPT>\n\t\t-p tcp --dport 22 -j ACCEPT\n"
        );
    }

    #[test]
    fn test_parse_error_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(&dir, "nat.rules", "-N PRE\n");
        let bad = write(&dir, "filter.rules", "-P INPUT ACCEPT\n-X INPUT\n");
        let output = dir.path().join("ruleset.conf");

        let converter = Converter::new();
        let err = converter
            .convert_to_file(&[good, bad.clone()], &output)
            .unwrap_err();

        match err.downcast_ref::<ConvertError>() {
            Some(ConvertError::Parse { path, source }) => {
                assert_eq!(path, &bad);
                assert!(matches!(source, ParseError::UnknownRecord { line: 2, .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!output.exists());
    }

    #[test]
    fn test_undeclared_chain_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(&dir, "filter.rules", "-A FORWARD -j DROP\n");
        let output = dir.path().join("ruleset.conf");

        let err = Converter::new()
            .convert_to_file(&[input], &output)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConvertError>(),
            Some(ConvertError::Parse {
                source: ParseError::UndeclaredChain { .. },
                ..
            })
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = Converter::new()
            .convert(&[dir.path().join("raw.rules")])
            .unwrap_err();
        assert!(matches!(err, ConvertError::Io { .. }));
    }

    #[test]
    fn test_check_reports_drift() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(&dir, "filter.rules", "-P INPUT DROP\n");
        let output = dir.path().join("ruleset.conf");
        let converter = Converter::new();

        let missing = converter.check(&[input.clone()], &output).unwrap();
        assert!(!missing.is_current());
        assert!(missing.existing.is_none());
        assert!(missing.diff().unwrap().contains("+\t<INPUT:DROP>"));
        assert!(!output.exists());

        converter.convert_to_file(&[input.clone()], &output).unwrap();
        let clean = converter.check(&[input.clone()], &output).unwrap();
        assert!(clean.is_current());
        assert!(clean.diff().is_none());

        std::fs::write(&input, "-P INPUT ACCEPT\n").unwrap();
        let drift = converter.check(&[input], &output).unwrap();
        assert!(!drift.is_current());
        let diff = drift.diff().unwrap();
        assert!(diff.contains("-\t<INPUT:DROP>"));
        assert!(diff.contains("+\t<INPUT:ACCEPT>"));
        assert!(diff.contains("@@"));
    }
}
