// src/scorer.rs
//! QALY scorer: compiled clause table plus article scoring.
//!
//! A `ScorerBuilder` compiles every table row into DNF clauses and maps each
//! clause to `(score, topic)`. `build()` freezes the result into an immutable
//! `Scorer` that can be shared across threads without locking.
//!
//! Scoring policy: a clause matches when every keyword is a case-sensitive
//! substring of the text. A topic contributes its score once per article, on
//! the first of its clauses that matches; further matching clauses of the same
//! topic add nothing.

use crate::expr::{compile, Clause};
use crate::table::{ScoringTable, TableError, TableRow};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

pub const ENV_SCORER_DEV_LOG: &str = "SCORER_DEV_LOG";
pub const ENV_CURATOR_ENV: &str = "CURATOR_ENV";

/// Per-article score lines are only emitted with `SCORER_DEV_LOG=1`, and then
/// only in debug builds or when `CURATOR_ENV` names a local/dev deployment.
pub(crate) fn dev_logging_enabled() -> bool {
    if std::env::var(ENV_SCORER_DEV_LOG).as_deref() != Ok("1") {
        return false;
    }
    cfg!(debug_assertions)
        || std::env::var(ENV_CURATOR_ENV).is_ok_and(|env| {
            ["local", "development", "dev"]
                .iter()
                .any(|d| env.trim().eq_ignore_ascii_case(d))
        })
}

/// Id for an article in score logs: the scorer only sees the body, so the body's
/// SHA-256 (first 12 hex chars) stands in for the URL.
pub(crate) fn article_id(text: &str) -> String {
    use sha2::{Digest, Sha256};
    Sha256::digest(text.as_bytes())[..6]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn dev_log_score(text: &str, matched: &[&Clause], result: &ScoreResult) {
    if !dev_logging_enabled() {
        return;
    }
    let id = article_id(text);
    let clauses: Vec<String> = matched.iter().take(5).map(|c| c.to_string()).collect();
    info!(
        target: "scorer",
        %id,
        score = result.score,
        topics = ?result.topics,
        clauses = ?clauses,
        "scored article"
    );
}

/// What to do when two different topics compile to the same clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Later row wins; the clause keeps its original position. Logged as a warning.
    #[default]
    Overwrite,
    /// Fail the load with `TableError::ClauseCollision`.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClauseEntry {
    pub clause: Clause,
    pub score: f64,
    pub topic: String,
}

/// Per-article outcome.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: f64,
    pub topics: Vec<String>,
}

impl ScoreResult {
    pub fn is_match(&self) -> bool {
        !self.topics.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ScorerBuilder {
    policy: CollisionPolicy,
    entries: Vec<ClauseEntry>,
    index: HashMap<Clause, usize>,
    collisions: usize,
}

impl ScorerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Insert one clause. Re-inserting a clause for the same topic just updates its score.
    pub fn insert(&mut self, clause: Clause, score: f64, topic: &str) -> Result<(), TableError> {
        if let Some(&i) = self.index.get(&clause) {
            let existing = &mut self.entries[i];
            if existing.topic != topic {
                if self.policy == CollisionPolicy::Reject {
                    return Err(TableError::ClauseCollision {
                        clause: clause.to_string(),
                        existing: existing.topic.clone(),
                        incoming: topic.to_string(),
                    });
                }
                warn!(
                    target: "scorer",
                    clause = %clause,
                    previous = %existing.topic,
                    topic,
                    "clause claimed by two topics; keeping the later one"
                );
                self.collisions += 1;
            }
            existing.score = score;
            existing.topic = topic.to_string();
            return Ok(());
        }
        self.index.insert(clause.clone(), self.entries.len());
        self.entries.push(ClauseEntry {
            clause,
            score,
            topic: topic.to_string(),
        });
        Ok(())
    }

    /// Compile a table row and insert all of its clauses.
    pub fn add_row(&mut self, row: &TableRow) -> Result<(), TableError> {
        let clauses = compile(&row.expression).map_err(|source| TableError::Expression {
            line: row.line,
            topic: row.topic.clone(),
            source,
        })?;
        debug!(
            target: "scorer",
            topic = %row.topic,
            clauses = clauses.len(),
            "compiled topic expression"
        );
        for clause in clauses {
            self.insert(clause, row.score, &row.topic)?;
        }
        Ok(())
    }

    pub fn build(self) -> Scorer {
        info!(
            target: "scorer",
            clauses = self.entries.len(),
            collisions = self.collisions,
            "scorer built"
        );
        Scorer {
            entries: self.entries,
        }
    }
}

/// Immutable compiled scorer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Scorer {
    entries: Vec<ClauseEntry>,
}

impl Scorer {
    pub fn builder() -> ScorerBuilder {
        ScorerBuilder::new()
    }

    pub fn from_table(table: &ScoringTable, policy: CollisionPolicy) -> Result<Self, TableError> {
        let mut b = ScorerBuilder::new().collision_policy(policy);
        for row in &table.topics {
            b.add_row(row)?;
        }
        Ok(b.build())
    }

    pub fn entries(&self) -> &[ClauseEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the `(score, topic)` a clause maps to.
    pub fn get(&self, clause: &Clause) -> Option<(f64, &str)> {
        self.entries
            .iter()
            .find(|e| &e.clause == clause)
            .map(|e| (e.score, e.topic.as_str()))
    }

    /// Score one article. Never fails; no match yields `(0, [])`.
    pub fn score(&self, text: &str) -> ScoreResult {
        let mut result = ScoreResult::default();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut matched: Vec<&Clause> = Vec::new();

        for entry in &self.entries {
            if !entry.clause.matches(text) {
                continue;
            }
            matched.push(&entry.clause);
            if seen.insert(entry.topic.as_str()) {
                result.score += entry.score;
                result.topics.push(entry.topic.clone());
            }
        }

        dev_log_score(text, &matched, &result);
        result
    }
}

/// Build a scorer from rows with the default collision policy.
pub fn load_table(rows: &[TableRow]) -> Result<Scorer, TableError> {
    let mut b = ScorerBuilder::new();
    for row in rows {
        b.add_row(row)?;
    }
    Ok(b.build())
}

/// Free-function form of [`Scorer::score`].
pub fn score(text: &str, scorer: &Scorer) -> ScoreResult {
    scorer.score(text)
}
