// src/curate/scheduler.rs
use super::Curator;
use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub interval_secs: u64,
    /// Stop after this long; `None` runs until the handle is aborted.
    pub max_runtime_secs: Option<u64>,
}

/// Spawn the repeating curation loop. The first tick fires immediately.
pub fn spawn_scheduler(curator: Arc<Curator>, cfg: SchedulerCfg) -> JoinHandle<()> {
    tokio::spawn(async move {
        let started = Instant::now();
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs.max(1)));
        loop {
            ticker.tick().await;
            if let Some(max) = cfg.max_runtime_secs {
                if started.elapsed() >= Duration::from_secs(max) {
                    tracing::info!(target: "curate", max_runtime_secs = max, "scheduler stopping");
                    break;
                }
            }
            match curator.run_once(Utc::now()).await {
                Ok(report) => {
                    tracing::debug!(target: "curate", post = %report.post, "tick published");
                }
                Err(e) => {
                    counter!("curator_tick_errors_total").increment(1);
                    tracing::warn!(target: "curate", error = ?e, "curation tick failed");
                }
            }
        }
    })
}
