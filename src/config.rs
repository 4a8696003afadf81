// src/config.rs
//! Curator configuration (TOML) with env overrides.
//!
//! Resolution order:
//! 1) $CURATOR_CONFIG_PATH (must exist)
//! 2) config/curator.toml
//! 3) built-in defaults
//!
//! Then `CURATOR_TABLE_PATH` and `CURATOR_QALY_THRESHOLD` override single fields.

use crate::scorer::CollisionPolicy;
use crate::select::SelectionParams;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CURATOR_CONFIG_PATH: &str = "config/curator.toml";
pub const DEFAULT_TABLE_PATH: &str = "global_prios/global_prios.csv";

pub const ENV_CURATOR_CONFIG_PATH: &str = "CURATOR_CONFIG_PATH";
pub const ENV_TABLE_PATH: &str = "CURATOR_TABLE_PATH";
pub const ENV_QALY_THRESHOLD: &str = "CURATOR_QALY_THRESHOLD";

/// Ten years.
pub const MAX_WINDOW_HOURS: f64 = 10.0 * 365.0 * 24.0;
/// One week.
pub const MAX_LAG_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuratorConfig {
    /// QALY table, CSV or TOML.
    pub table_path: PathBuf,
    pub collision_policy: CollisionPolicy,
    /// Seconds between curation ticks.
    pub interval_secs: u64,
    /// Publication window (hours) candidates are drawn from.
    pub window_hours: f64,
    /// Refresh the store when its newest article is older than this (hours).
    pub refresh_period_hours: f64,
    /// Query the source this many minutes before the newest stored article.
    pub lag_minutes: i64,
    pub qaly_threshold: f64,
    pub sample_log_space: bool,
    /// Blocking tasks used for batch scoring.
    pub workers: usize,
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            table_path: PathBuf::from(DEFAULT_TABLE_PATH),
            collision_policy: CollisionPolicy::Overwrite,
            interval_secs: 3600,
            window_hours: 24.0,
            refresh_period_hours: 8.0,
            lag_minutes: 20,
            qaly_threshold: 1.0,
            sample_log_space: true,
            workers: 4,
        }
    }
}

// parse optional non-negative float env
fn parse_threshold_env(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
}

impl CuratorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: CuratorConfig = toml::from_str(s)?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading curator config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing curator config {}", path.display()))
    }

    /// Load using env var + fallbacks, then apply env overrides.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CURATOR_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_CURATOR_CONFIG_PATH} points to non-existent path {}",
                    pb.display()
                ));
            }
            Self::load_from(&pb)?
        } else {
            let p = PathBuf::from(DEFAULT_CURATOR_CONFIG_PATH);
            if p.exists() {
                Self::load_from(&p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(p) = std::env::var(ENV_TABLE_PATH) {
            if !p.trim().is_empty() {
                self.table_path = PathBuf::from(p.trim());
            }
        }
        if let Some(t) = parse_threshold_env(std::env::var(ENV_QALY_THRESHOLD).ok()) {
            self.qaly_threshold = t;
        }
    }

    fn sanitize(&mut self) {
        let d = Self::default();
        if !(self.window_hours.is_finite() && self.window_hours > 0.0) {
            self.window_hours = d.window_hours;
        }
        self.window_hours = self.window_hours.min(MAX_WINDOW_HOURS);
        if !(self.refresh_period_hours.is_finite() && self.refresh_period_hours >= 0.0) {
            self.refresh_period_hours = d.refresh_period_hours;
        }
        if !(self.qaly_threshold.is_finite() && self.qaly_threshold >= 0.0) {
            self.qaly_threshold = d.qaly_threshold;
        }
        self.interval_secs = self.interval_secs.max(1);
        self.lag_minutes = self.lag_minutes.clamp(0, MAX_LAG_MINUTES);
        self.workers = self.workers.max(1);
    }

    pub fn selection_params(&self) -> SelectionParams {
        SelectionParams {
            window_hours: self.window_hours,
            threshold: self.qaly_threshold,
            sample_log_space: self.sample_log_space,
        }
    }
}
