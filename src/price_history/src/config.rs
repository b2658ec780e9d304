//! Tracker configuration: parsing, normalization, and loading.
//!
//! A TOML file describes:
//! - where the snapshot store lives and where exported series go,
//! - the ingestion cadence (fixed interval or a daily wall-clock time),
//! - the ordered list of sources to poll (`{id, target, kind, url}`).
//!
//! Key behaviors:
//! - Normalization trims every field, rejects empty ids/targets/urls, and drops
//!   duplicate `(id, target)` pairs while preserving the first occurrence.
//! - The cadence is validated eagerly so a bad `at`/`timezone` fails at load time,
//!   not at the first scheduled run.
//!
//! Entrypoints:
//! - Parse + normalize from a TOML string: [`load_config_str`]
//! - Parse + normalize from a file path: [`load_config_path`]
//! - Starter file with the stock CoinMarketCap sources: [`write_default_config`]

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, bail};
use chrono::NaiveTime;
use chrono_tz::Tz;
use price_feed::models::source_target::{ProviderKind, SourceTarget};
use serde::{Deserialize, Serialize};

use crate::scheduler::{
    DEFAULT_FETCH_TIMEOUT,
    trigger::{DailyTrigger, IntervalTrigger, Trigger},
};

/// Default location of the config file.
pub const DEFAULT_CONFIG_PATH: &str = "price_history.toml";

/// Env var consulted when `--config` is not given.
pub const CONFIG_ENV: &str = "PRICE_HISTORY_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    /// Snapshot store file.
    pub store_path: PathBuf,
    /// Directory the series exporter writes to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Per-source fetch timeout in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Ingestion cadence.
    #[serde(default)]
    pub schedule: ScheduleCfg,
    /// Sources to poll, in order.
    #[serde(default)]
    pub sources: Vec<SourceTarget>,
}

/// How often an ingestion cycle runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScheduleCfg {
    /// Every `every_secs` seconds; the first cycle runs immediately.
    Interval {
        /// Period in seconds.
        every_secs: u64,
    },
    /// Once a day at a local wall-clock time.
    Daily {
        /// `HH:MM` (24h).
        at: String,
        /// IANA time zone name the time is interpreted in.
        #[serde(default = "default_timezone")]
        timezone: String,
        /// Also run once right away at startup.
        #[serde(default)]
        run_at_start: bool,
    },
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        ScheduleCfg::Interval { every_secs: 3600 }
    }
}

impl ScheduleCfg {
    /// Builds the trigger this cadence describes.
    pub fn to_trigger(&self) -> anyhow::Result<Box<dyn Trigger>> {
        match self {
            ScheduleCfg::Interval { every_secs } => {
                if *every_secs == 0 {
                    bail!("schedule.every_secs must be greater than zero");
                }
                Ok(Box::new(IntervalTrigger::new(Duration::from_secs(
                    *every_secs,
                ))))
            }
            ScheduleCfg::Daily {
                at,
                timezone,
                run_at_start,
            } => {
                let at = parse_hh_mm(at)?;
                let tz: Tz = timezone
                    .parse()
                    .map_err(|e| anyhow::anyhow!("bad timezone {timezone:?}: {e}"))?;
                Ok(Box::new(DailyTrigger::new(at, tz).run_at_start(*run_at_start)))
            }
        }
    }
}

fn parse_hh_mm(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .with_context(|| format!("schedule.at must be HH:MM, got {s:?}"))
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("visualizations")
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT.as_secs()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Summary of changes performed during normalization.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    /// Fields that changed when trimmed.
    pub fields_trimmed: usize,
    /// Duplicate `(id, target)` sources removed.
    pub sources_deduped: usize,
}

/// Normalize a config in place.
///
/// Errors:
/// - Empty `id`, `target` or `url` after trimming
/// - Invalid cadence (zero interval, malformed `at`, unknown time zone)
pub fn normalize_config(cfg: &mut TrackerConfig) -> anyhow::Result<NormalizationReport> {
    let mut report = NormalizationReport::default();

    if cfg.store_path.as_os_str().is_empty() {
        bail!("store_path cannot be empty");
    }
    if cfg.fetch_timeout_secs == 0 {
        bail!("fetch_timeout_secs must be greater than zero");
    }

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(cfg.sources.len());
    for (i, mut src) in std::mem::take(&mut cfg.sources).into_iter().enumerate() {
        for (label, field) in [
            ("id", &mut src.id),
            ("target", &mut src.target),
            ("url", &mut src.url),
        ] {
            let trimmed = field.trim();
            if trimmed.is_empty() {
                bail!("sources[{i}].{label} cannot be empty after trimming");
            }
            if trimmed.len() != field.len() {
                report.fields_trimmed += 1;
                *field = trimmed.to_string();
            }
        }
        src.description = src
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        if seen.insert((src.id.clone(), src.target.clone())) {
            out.push(src);
        } else {
            report.sources_deduped += 1;
        }
    }
    cfg.sources = out;

    cfg.schedule.to_trigger().context("invalid schedule")?;
    Ok(report)
}

/// Parse and normalize a config from a TOML string.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<TrackerConfig> {
    let mut cfg: TrackerConfig = toml::from_str(toml_str).context("failed to parse config TOML")?;
    let report = normalize_config(&mut cfg).context("normalize_config failed")?;
    tracing::debug!(?report, "config normalized");
    Ok(cfg)
}

/// Read a config TOML file from disk, parse, and normalize it.
pub fn load_config_path(path: impl AsRef<Path>) -> anyhow::Result<TrackerConfig> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    load_config_str(&text)
}

/// The stock setup: Bitcoin, Ethereum and XRP from CoinMarketCap, polled hourly.
pub fn default_config() -> TrackerConfig {
    let cmc = |id: &str, target: &str, slug: &str| SourceTarget {
        id: id.to_string(),
        target: target.to_string(),
        kind: ProviderKind::CoinMarketCap,
        url: format!("https://coinmarketcap.com/currencies/{slug}/"),
        description: Some(format!("Price of {target}")),
    };
    TrackerConfig {
        store_path: PathBuf::from("crypto_data/crypto_prices.db"),
        output_dir: default_output_dir(),
        fetch_timeout_secs: default_fetch_timeout_secs(),
        schedule: ScheduleCfg::default(),
        sources: vec![
            cmc("CoinMarketCap", "Bitcoin", "bitcoin"),
            cmc("CoinMarketCap-ETH", "Ethereum", "ethereum"),
            cmc("CoinMarketCap-XRP", "XRP", "xrp"),
        ],
    }
}

/// Writes [`default_config`] to `path` unless a file already exists there.
///
/// Returns `true` when a file was created.
pub fn write_default_config(path: impl AsRef<Path>) -> anyhow::Result<bool> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create config directory {}", parent.display()))?;
    }
    let text = toml::to_string_pretty(&default_config()).context("serialize default config")?;
    std::fs::write(path, text).with_context(|| format!("write config file {}", path.display()))?;
    Ok(true)
}
