// src/curate/types.rs
use crate::select::Candidate;
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Article body as returned by the content-retrieval collaborator.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct RawArticle {
    pub url: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
    pub source: Option<String>,
}

/// News listing + full-text retrieval.
#[async_trait::async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch_since(&self, since: DateTime<Utc>) -> Result<Vec<RawArticle>>;
    fn name(&self) -> &str;
}

/// Persistent store of scored articles, keyed by URL.
#[async_trait::async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert new rows; URLs already present are left untouched. Returns rows inserted.
    async fn insert_scored(&self, items: Vec<Candidate>) -> Result<usize>;
    /// Rows published strictly after `since`.
    async fn fetch_since(&self, since: DateTime<Utc>) -> Result<Vec<Candidate>>;
    async fn newest_published(&self) -> Result<Option<DateTime<Utc>>>;
}

/// Social feed the selected article is posted to.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, text: &str) -> Result<()>;
}
