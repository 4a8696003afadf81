//! qaly-curator — scores a JSON file of articles against the QALY table.
//!
//! Usage: `qaly-curator <articles.json> [--pick]`
//!
//! The articles file maps URL to either plain text or an object with `content`
//! and optional `published_at`. Scored articles are printed as JSON; with
//! `--pick` the post that would be published right now is included.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use qaly_curator::config::CuratorConfig;
use qaly_curator::select::{compose_post, select_article, Candidate};
use qaly_curator::{load_scorer, score_batch_concurrent, Article, ArticleMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qaly_curator=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArticleInput {
    Text(String),
    Full(Article),
}

#[derive(Serialize)]
struct Output {
    articles: ArticleMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    post: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next().map(PathBuf::from) else {
        bail!("usage: qaly-curator <articles.json> [--pick]");
    };
    let pick = args.any(|a| a == "--pick");

    let cfg = CuratorConfig::load_default()?;
    let scorer = Arc::new(load_scorer(&cfg.table_path, cfg.collision_policy)?);

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading articles from {}", path.display()))?;
    let inputs: BTreeMap<String, ArticleInput> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing articles from {}", path.display()))?;
    let articles: ArticleMap = inputs
        .into_iter()
        .map(|(url, a)| match a {
            ArticleInput::Text(t) => (url, Article::new(t)),
            ArticleInput::Full(a) => (url, a),
        })
        .collect();

    let scored = score_batch_concurrent(articles, scorer, cfg.workers).await?;

    let post = if pick {
        let now = Utc::now();
        let candidates: Vec<Candidate> = scored
            .iter()
            .map(|(url, a)| Candidate {
                url: url.clone(),
                score: a.score,
                topics: a.topics.clone(),
                published_at: a.published_at.unwrap_or(now),
                source: a.source.clone(),
            })
            .collect();
        let params = cfg.selection_params();
        let selection = select_article(&candidates, now, &params, &mut rand::rng());
        Some(compose_post(&selection, now, params.window_hours))
    } else {
        None
    };

    let out = Output {
        articles: scored,
        post,
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
