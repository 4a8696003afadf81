// src/select.rs
//! Priority-weighted random pick of one recent article to publish.
//!
//! Candidates published inside the time window are drawn with probability
//! proportional to their score (by default `ln(score + 1)`, which flattens the
//! lead of a few very high-scoring topics). When the summed score in the window
//! is below the threshold, nothing is picked and a "nothing interesting" post is
//! produced instead.

use chrono::{DateTime, Duration, Utc};
use rand::distr::{weighted::WeightedIndex, Distribution};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Scored article as kept in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub url: String,
    pub score: f64,
    pub topics: Vec<String>,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionParams {
    /// How far back (hours) candidates may be published.
    pub window_hours: f64,
    /// Minimum summed score in the window before anything is picked.
    pub threshold: f64,
    /// Sample on `ln(score + 1)` instead of the raw score.
    pub sample_log_space: bool,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            window_hours: 24.0,
            threshold: 1.0,
            sample_log_space: true,
        }
    }
}

impl SelectionParams {
    /// Oldest publication time still inside the window. Windows reaching past
    /// the representable range clamp to `DateTime::<Utc>::MIN_UTC`.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        // `as` saturates, so out-of-range hours land on a `None` below.
        Duration::try_seconds((self.window_hours * 3600.0) as i64)
            .and_then(|w| now.checked_sub_signed(w))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Picked(Candidate),
    Nothing { total: f64 },
}

/// `"; "`-joined topics, `NULL` when there are none.
pub fn topic_string(topics: &[String]) -> String {
    if topics.is_empty() {
        "NULL".to_string()
    } else {
        topics.join("; ")
    }
}

fn weight(score: f64, log_space: bool) -> f64 {
    let w = if log_space { (score + 1.0).ln() } else { score };
    if w.is_finite() && w > 0.0 {
        w
    } else {
        0.0
    }
}

/// Draw one candidate published after `now - window`.
pub fn select_article<R: Rng + ?Sized>(
    candidates: &[Candidate],
    now: DateTime<Utc>,
    params: &SelectionParams,
    rng: &mut R,
) -> Selection {
    let from = params.window_start(now);
    let recent: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.published_at > from)
        .collect();

    let total: f64 = recent.iter().map(|c| c.score).sum();
    if recent.is_empty() || total < params.threshold {
        tracing::info!(
            target: "curate",
            candidates = recent.len(),
            total,
            threshold = params.threshold,
            "nothing above threshold in window"
        );
        return Selection::Nothing { total };
    }

    let weights: Vec<f64> = recent
        .iter()
        .map(|c| weight(c.score, params.sample_log_space))
        .collect();
    let dist = match WeightedIndex::new(&weights) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(target: "curate", error = %e, "no positive weights in window");
            return Selection::Nothing { total };
        }
    };
    Selection::Picked(recent[dist.sample(rng)].clone())
}

/// Text to publish for a selection result.
pub fn compose_post(selection: &Selection, now: DateTime<Utc>, window_hours: f64) -> String {
    let stamp = now.format("%Y-%m-%d %H:%M:%S");
    match selection {
        Selection::Picked(c) => format!("{} {}\n{}", topic_string(&c.topics), stamp, c.url),
        Selection::Nothing { .. } => format!(
            "I didn't find anything interesting in the past {window_hours} hrs, at: {stamp}"
        ),
    }
}
