// src/curate/mod.rs
//! One curation tick: refresh the store when stale, score new articles, draw one
//! recent article by QALY weight and publish it.

pub mod scheduler;
pub mod store;
pub mod types;

use crate::batch::{score_batch_concurrent, Article, ArticleMap};
use crate::config::CuratorConfig;
use crate::scorer::Scorer;
use crate::select::{compose_post, select_article, Candidate, Selection};
use crate::curate::types::{ArticleSource, ArticleStore, Publisher, RawArticle};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("curator_ticks_total", "Curation ticks completed.");
        describe_counter!(
            "curator_articles_scored_total",
            "Articles scored against the QALY table."
        );
        describe_counter!(
            "curator_source_errors_total",
            "Article source fetch errors."
        );
        describe_counter!("curator_tick_errors_total", "Curation ticks that failed.");
        describe_gauge!("curator_last_tick_ts", "Unix ts of the last completed tick.");
    });
}

/// What a tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub refreshed: bool,
    pub fetched: usize,
    pub inserted: usize,
    pub selection: Selection,
    pub post: String,
}

pub struct Curator {
    scorer: Arc<Scorer>,
    source: Arc<dyn ArticleSource>,
    store: Arc<dyn ArticleStore>,
    publisher: Arc<dyn Publisher>,
    cfg: CuratorConfig,
    rng: Mutex<StdRng>,
}

impl Curator {
    pub fn new(
        scorer: Arc<Scorer>,
        source: Arc<dyn ArticleSource>,
        store: Arc<dyn ArticleStore>,
        publisher: Arc<dyn Publisher>,
        cfg: CuratorConfig,
    ) -> Self {
        Self {
            scorer,
            source,
            store,
            publisher,
            cfg,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Replace the RNG, e.g. with a seeded one for reproducible draws.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn config(&self) -> &CuratorConfig {
        &self.cfg
    }

    fn needs_refresh(&self, newest: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match newest {
            None => true,
            Some(t) => {
                let age_hours = (now - t).num_seconds() as f64 / 3600.0;
                age_hours > self.cfg.refresh_period_hours
            }
        }
    }

    async fn refresh(&self, since: DateTime<Utc>, now: DateTime<Utc>) -> Result<(usize, usize)> {
        let raw = match self.source.fetch_since(since).await {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "curate", error = ?e, source = self.source.name(), "source error");
                counter!("curator_source_errors_total").increment(1);
                return Ok((0, 0));
            }
        };
        let fetched = raw.len();

        let articles: ArticleMap = raw
            .into_iter()
            .map(|RawArticle { url, content, published_at, source }| {
                let mut a = Article::new(content).published(published_at);
                a.source = source;
                (url, a)
            })
            .collect();
        let scored =
            score_batch_concurrent(articles, Arc::clone(&self.scorer), self.cfg.workers).await?;

        let rows: Vec<Candidate> = scored
            .into_iter()
            .map(|(url, a)| Candidate {
                url,
                score: a.score,
                topics: a.topics,
                published_at: a.published_at.unwrap_or(now),
                source: a.source,
            })
            .collect();
        let inserted = self
            .store
            .insert_scored(rows)
            .await
            .context("storing scored articles")?;
        Ok((fetched, inserted))
    }

    /// Run a single tick at `now`.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<TickReport> {
        ensure_metrics_described();
        let params = self.cfg.selection_params();
        let window_start = params.window_start(now);

        let newest = self
            .store
            .newest_published()
            .await
            .context("reading newest stored article")?;

        let refreshed = self.needs_refresh(newest, now);
        let (fetched, inserted) = if refreshed {
            let since = match newest {
                Some(t) => Duration::try_minutes(self.cfg.lag_minutes)
                    .and_then(|lag| t.checked_sub_signed(lag))
                    .unwrap_or(window_start),
                None => window_start,
            };
            info!(target: "curate", %since, "store outdated, refreshing");
            self.refresh(since, now).await?
        } else {
            (0, 0)
        };

        let candidates = self
            .store
            .fetch_since(window_start)
            .await
            .context("reading recent articles")?;
        let selection = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            select_article(&candidates, now, &params, &mut *rng)
        };
        let post = compose_post(&selection, now, params.window_hours);
        self.publisher
            .publish(&post)
            .await
            .context("publishing post")?;

        counter!("curator_ticks_total").increment(1);
        gauge!("curator_last_tick_ts").set(now.timestamp().max(0) as f64);
        info!(
            target: "curate",
            refreshed,
            fetched,
            inserted,
            candidates = candidates.len(),
            picked = matches!(selection, Selection::Picked(_)),
            "tick done"
        );

        Ok(TickReport {
            refreshed,
            fetched,
            inserted,
            selection,
            post,
        })
    }
}
