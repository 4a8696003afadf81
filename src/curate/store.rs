// src/curate/store.rs
//! In-memory `ArticleStore`.

use super::types::ArticleStore;
use crate::select::Candidate;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<String, Candidate>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    pub async fn get(&self, url: &str) -> Option<Candidate> {
        self.rows.read().await.get(url).cloned()
    }
}

#[async_trait::async_trait]
impl ArticleStore for MemoryStore {
    async fn insert_scored(&self, items: Vec<Candidate>) -> Result<usize> {
        let mut rows = self.rows.write().await;
        let mut inserted = 0usize;
        for c in items {
            if rows.contains_key(&c.url) {
                continue;
            }
            rows.insert(c.url.clone(), c);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn fetch_since(&self, since: DateTime<Utc>) -> Result<Vec<Candidate>> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|c| c.published_at > since)
            .cloned()
            .collect())
    }

    async fn newest_published(&self) -> Result<Option<DateTime<Utc>>> {
        let rows = self.rows.read().await;
        Ok(rows.values().map(|c| c.published_at).max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn cand(url: &str, score: f64, at: DateTime<Utc>) -> Candidate {
        Candidate {
            url: url.into(),
            score,
            topics: vec![],
            published_at: at,
            source: None,
        }
    }

    #[tokio::test]
    async fn insert_or_ignore_by_url() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let s = MemoryStore::new();
        assert_eq!(s.newest_published().await.unwrap(), None);

        let n = s
            .insert_scored(vec![cand("a", 1.0, t0), cand("b", 2.0, t0 + Duration::hours(2))])
            .await
            .unwrap();
        assert_eq!(n, 2);

        let n = s.insert_scored(vec![cand("a", 99.0, t0)]).await.unwrap();
        assert_eq!(n, 0);
        assert_eq!(s.get("a").await.unwrap().score, 1.0);

        assert_eq!(
            s.newest_published().await.unwrap(),
            Some(t0 + Duration::hours(2))
        );
        let recent = s.fetch_since(t0).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].url, "b");
    }
}
