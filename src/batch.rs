// src/batch.rs
//! Batch scoring over a map of articles keyed by URL.

use crate::scorer::Scorer;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;

/// An article as fetched, plus its score once `score_batch` has run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub content: String,
    #[serde(default, alias = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl Article {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }
}

pub type ArticleMap = BTreeMap<String, Article>;

/// Score every article in place and hand the map back.
pub fn score_batch(mut articles: ArticleMap, scorer: &Scorer) -> ArticleMap {
    for article in articles.values_mut() {
        let r = scorer.score(&article.content);
        article.score = r.score;
        article.topics = r.topics;
    }
    counter!("curator_articles_scored_total").increment(articles.len() as u64);
    articles
}

/// Same as [`score_batch`] but fans out over blocking tasks, `workers` chunks at most.
/// Entries are independent, so the only coordination is merging the chunks back.
pub async fn score_batch_concurrent(
    articles: ArticleMap,
    scorer: Arc<Scorer>,
    workers: usize,
) -> Result<ArticleMap> {
    if articles.is_empty() {
        return Ok(articles);
    }
    let workers = workers.max(1);
    let chunk_size = articles.len().div_ceil(workers);

    let mut items: Vec<(String, Article)> = articles.into_iter().collect();
    let mut set = JoinSet::new();
    while !items.is_empty() {
        let rest = items.split_off(chunk_size.min(items.len()));
        let chunk = std::mem::replace(&mut items, rest);
        let scorer = Arc::clone(&scorer);
        set.spawn_blocking(move || {
            chunk
                .into_iter()
                .map(|(url, mut a)| {
                    let r = scorer.score(&a.content);
                    a.score = r.score;
                    a.topics = r.topics;
                    (url, a)
                })
                .collect::<Vec<_>>()
        });
    }

    let mut out = ArticleMap::new();
    while let Some(joined) = set.join_next().await {
        out.extend(joined.context("scoring worker panicked")?);
    }
    counter!("curator_articles_scored_total").increment(out.len() as u64);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::load_table;
    use crate::table::TableRow;

    fn scorer() -> Scorer {
        load_table(&[
            TableRow::new("Poverty", 5.0, "poverty"),
            TableRow::new("Malaria", 8.0, "malaria AND (bednet OR vaccine)"),
        ])
        .unwrap()
    }

    fn sample() -> ArticleMap {
        let mut m = ArticleMap::new();
        m.insert("https://a".into(), Article::new("poverty and malaria vaccine"));
        m.insert("https://b".into(), Article::new("sports results"));
        m.insert("https://c".into(), Article::new("malaria bednet drive"));
        m
    }

    #[test]
    fn attaches_score_and_topics() {
        let out = score_batch(sample(), &scorer());
        assert_eq!(out["https://a"].score, 13.0);
        assert_eq!(out["https://a"].topics, vec!["Poverty", "Malaria"]);
        assert_eq!(out["https://b"].score, 0.0);
        assert!(out["https://b"].topics.is_empty());
        assert_eq!(out["https://c"].topics, vec!["Malaria"]);
    }

    #[tokio::test]
    async fn concurrent_matches_sequential() {
        let s = scorer();
        let seq = score_batch(sample(), &s);
        for workers in [1, 2, 8] {
            let par = score_batch_concurrent(sample(), Arc::new(s.clone()), workers)
                .await
                .unwrap();
            assert_eq!(par, seq);
        }
    }

    #[test]
    fn article_json_accepts_camel_case_date() {
        let a: Article =
            serde_json::from_str(r#"{"content":"x","publishedAt":"2024-05-01T10:00:00Z"}"#)
                .unwrap();
        assert!(a.published_at.is_some());
        assert_eq!(a.score, 0.0);
    }
}
