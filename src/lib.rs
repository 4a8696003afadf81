// src/lib.rs
// Public library surface for integration tests and the binary.

pub mod batch;
pub mod config;
pub mod expr;
pub mod scorer;
pub mod select;
pub mod table;

// Periodic curation cycle (collaborator traits, in-memory store, scheduler)
pub mod curate;

// ---- Re-exports for stable public API ----
pub use crate::batch::{score_batch, score_batch_concurrent, Article, ArticleMap};
pub use crate::expr::{compile, Clause, ExprError};
pub use crate::scorer::{load_table, score, CollisionPolicy, ScoreResult, Scorer, ScorerBuilder};
pub use crate::select::{select_article, Candidate, Selection, SelectionParams};
pub use crate::table::{ScoringTable, TableError, TableRow};

use std::path::Path;
use tracing::info;

/// Load a table from disk and compile it into a scorer in one step.
pub fn load_scorer(path: &Path, policy: CollisionPolicy) -> anyhow::Result<Scorer> {
    let table = ScoringTable::from_path(path)?;
    let scorer = Scorer::from_table(&table, policy)?;
    info!(
        path = %path.display(),
        topics = table.len(),
        clauses = scorer.len(),
        "QALY table loaded"
    );
    Ok(scorer)
}
