// src/table.rs
//! QALY scoring table: one row per topic with its priority score and keyword
//! expression.
//!
//! Two on-disk formats are accepted:
//! - CSV-like text, `topic, score, expression, reference`, first line is a header
//! - TOML, an array of `[[topics]]` tables with the same keys
//!
//! Loading is all-or-nothing: a single bad row fails the whole table, since a
//! partially loaded scorer produces silently wrong scores.

use crate::expr::ExprError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("reading scoring table from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: expected 4 comma-separated fields (topic, score, expression, reference), found {found}")]
    FieldCount { line: usize, found: usize },
    #[error("line {line}: score `{value}` is not a finite number")]
    BadScore { line: usize, value: String },
    #[error("line {line}: empty {field}")]
    EmptyField { line: usize, field: &'static str },
    #[error("invalid TOML scoring table: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("line {line}, topic `{topic}`: {source}")]
    Expression {
        line: usize,
        topic: String,
        #[source]
        source: ExprError,
    },
    #[error("clause `{clause}` is claimed by topic `{existing}` and again by `{incoming}`")]
    ClauseCollision {
        clause: String,
        existing: String,
        incoming: String,
    },
}

/// A single table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub topic: String,
    pub score: f64,
    pub expression: String,
    #[serde(default)]
    pub reference: String,
    /// Source line (CSV) or 1-based entry index (TOML), for error reporting.
    #[serde(skip)]
    pub line: usize,
}

impl TableRow {
    pub fn new(topic: &str, score: f64, expression: &str) -> Self {
        Self {
            topic: topic.to_string(),
            score,
            expression: expression.to_string(),
            reference: String::new(),
            line: 0,
        }
    }

    fn validate(&self) -> Result<(), TableError> {
        if self.topic.trim().is_empty() {
            return Err(TableError::EmptyField {
                line: self.line,
                field: "topic",
            });
        }
        if self.expression.trim().is_empty() {
            return Err(TableError::EmptyField {
                line: self.line,
                field: "expression",
            });
        }
        if !self.score.is_finite() {
            return Err(TableError::BadScore {
                line: self.line,
                value: self.score.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringTable {
    #[serde(default)]
    pub topics: Vec<TableRow>,
}

impl ScoringTable {
    /// Parse the comma-separated form. The first line is a header and is skipped.
    /// Every other line, blank ones included, must hold exactly four fields.
    pub fn from_csv_str(text: &str) -> Result<Self, TableError> {
        let mut topics = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            if idx == 0 {
                continue;
            }
            let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
            if fields.len() != 4 {
                return Err(TableError::FieldCount {
                    line,
                    found: fields.len(),
                });
            }
            let score = fields[1]
                .parse::<f64>()
                .ok()
                .filter(|s| s.is_finite())
                .ok_or_else(|| TableError::BadScore {
                    line,
                    value: fields[1].to_string(),
                })?;
            let row = TableRow {
                topic: fields[0].to_string(),
                score,
                expression: fields[2].to_string(),
                reference: fields[3].to_string(),
                line,
            };
            row.validate()?;
            topics.push(row);
        }
        Ok(Self { topics })
    }

    /// Parse the TOML form (`[[topics]]` entries).
    pub fn from_toml_str(text: &str) -> Result<Self, TableError> {
        let mut table: ScoringTable = toml::from_str(text)?;
        for (i, row) in table.topics.iter_mut().enumerate() {
            row.line = i + 1;
            row.topic = row.topic.trim().to_string();
            row.expression = row.expression.trim().to_string();
        }
        for row in &table.topics {
            row.validate()?;
        }
        Ok(table)
    }

    /// Read a table from disk; `.toml` files use the TOML form, anything else CSV.
    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let content = fs::read_to_string(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_toml = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_csv_str(&content)
        }
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "topic,score,keywords,reference
Poverty, 5, poverty AND (global OR india), https://example.org/poverty
Climate,3.5,climate AND (change OR crisis),ref
Smoking,-1,\"tobacco use\" OR smoking,
";

    #[test]
    fn csv_skips_header() {
        let t = ScoringTable::from_csv_str(CSV).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.topics[0].topic, "Poverty");
        assert_eq!(t.topics[0].score, 5.0);
        assert_eq!(t.topics[0].expression, "poverty AND (global OR india)");
        assert_eq!(t.topics[0].reference, "https://example.org/poverty");
        assert_eq!(t.topics[0].line, 2);
        assert_eq!(t.topics[2].score, -1.0);
        assert_eq!(t.topics[2].line, 4);
        assert_eq!(t.topics[2].reference, "");
    }

    #[test]
    fn csv_wrong_field_count_is_fatal() {
        let err = ScoringTable::from_csv_str("h\nPoverty,5,poverty\n").unwrap_err();
        assert!(matches!(err, TableError::FieldCount { line: 2, found: 3 }));

        let err = ScoringTable::from_csv_str("h\nA,1,a OR b,ref,extra\n").unwrap_err();
        assert!(matches!(err, TableError::FieldCount { line: 2, found: 5 }));
    }

    #[test]
    fn csv_blank_row_is_fatal() {
        let err = ScoringTable::from_csv_str("topic,score,keywords,reference\nA,1,a,r\n\nB,2,b,r\n")
            .unwrap_err();
        assert!(matches!(err, TableError::FieldCount { line: 3, found: 1 }));

        let err = ScoringTable::from_csv_str("h\nA,1,a,r\n   \n").unwrap_err();
        assert!(matches!(err, TableError::FieldCount { line: 3, found: 1 }));

        // The final newline does not produce an extra row.
        let t = ScoringTable::from_csv_str("h\nA,1,a,r\nB,2,b,r\n").unwrap();
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn csv_bad_score_is_fatal() {
        let err = ScoringTable::from_csv_str("h\nA,high,a,r\n").unwrap_err();
        assert!(matches!(err, TableError::BadScore { line: 2, .. }));
        let err = ScoringTable::from_csv_str("h\nA,NaN,a,r\n").unwrap_err();
        assert!(matches!(err, TableError::BadScore { .. }));
    }

    #[test]
    fn csv_empty_expression_is_fatal() {
        let err = ScoringTable::from_csv_str("h\nA,1, ,r\n").unwrap_err();
        assert!(matches!(
            err,
            TableError::EmptyField {
                line: 2,
                field: "expression"
            }
        ));
    }

    #[test]
    fn toml_form() {
        let t = ScoringTable::from_toml_str(
            r#"
[[topics]]
topic = "Poverty"
score = 5
expression = 'poverty AND "low income"'
reference = "GBD 2019"

[[topics]]
topic = " Climate "
score = 2.5
expression = "climate"
"#,
        )
        .unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.topics[0].expression, r#"poverty AND "low income""#);
        assert_eq!(t.topics[1].topic, "Climate");
        assert_eq!(t.topics[1].line, 2);
        assert!(t.topics[1].reference.is_empty());
    }
}
