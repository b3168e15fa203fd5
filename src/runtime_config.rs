// =============================================================================
// Runtime Configuration — engine settings with atomic save
// =============================================================================
//
// Every tunable of the candle-sync engine lives here: which markets and
// intervals to warm, where the remote tiers live, where the cache is stored,
// and the stream reconnect policy.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// Environment variables (usually from `.env`) override the file:
//   CANDLE_SYNC_MARKETS      comma-separated market list
//   CANDLE_SYNC_BACKEND_URL  backend API base URL
//   CANDLE_SYNC_WS_URL       price stream WebSocket URL
//   CANDLE_SYNC_CACHE_DIR    cache directory
//
// =============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::market_data::Interval;
use crate::stream::StreamConfig;

pub const DEFAULT_CONFIG_PATH: &str = "candle_sync.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_markets() -> Vec<String> {
    vec![
        "BTC-PERP".to_string(),
        "ETH-PERP".to_string(),
        "SOL-PERP".to_string(),
    ]
}

fn default_intervals() -> Vec<Interval> {
    vec![Interval::H1, Interval::D1]
}

fn default_backend_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_exchange_url() -> String {
    "https://api.hyperliquid.xyz".to_string()
}

fn default_ws_url() -> String {
    "ws://localhost:8080/ws".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_reconnect_base_delay_ms() -> u64 {
    1_000
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_warmup_days() -> u32 {
    7
}

// =============================================================================
// EngineConfig
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    // --- Markets -------------------------------------------------------------

    /// Markets warmed at startup and subscribed for live prices.
    #[serde(default = "default_markets")]
    pub markets: Vec<String>,

    /// Intervals warmed at startup for every market.
    #[serde(default = "default_intervals")]
    pub intervals: Vec<Interval>,

    /// Days of history fetched per (market, interval) at startup.
    #[serde(default = "default_warmup_days")]
    pub warmup_days: u32,

    // --- Storage -------------------------------------------------------------

    /// Directory for the file-backed cache. `None` keeps the cache in memory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    // --- Remote tiers --------------------------------------------------------

    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    #[serde(default = "default_exchange_url")]
    pub exchange_url: String,

    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Per-request HTTP timeout for both REST tiers.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    // --- Stream reconnect policy ----------------------------------------------

    /// First reconnect delay; doubles with every failed attempt.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            markets: default_markets(),
            intervals: default_intervals(),
            warmup_days: default_warmup_days(),
            cache_dir: None,
            backend_url: default_backend_url(),
            exchange_url: default_exchange_url(),
            ws_url: default_ws_url(),
            request_timeout_secs: default_request_timeout_secs(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;

        info!(
            path = %path.display(),
            markets = ?config.markets,
            cache_dir = ?config.cache_dir,
            "engine config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise engine config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }

    /// Apply `CANDLE_SYNC_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(markets) = lookup("CANDLE_SYNC_MARKETS") {
            let markets: Vec<String> = markets
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
            if !markets.is_empty() {
                self.markets = markets;
            }
        }
        if let Some(url) = lookup("CANDLE_SYNC_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(url) = lookup("CANDLE_SYNC_WS_URL") {
            self.ws_url = url;
        }
        if let Some(dir) = lookup("CANDLE_SYNC_CACHE_DIR") {
            self.cache_dir = (!dir.trim().is_empty()).then(|| PathBuf::from(dir));
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            base_delay: Duration::from_millis(self.reconnect_base_delay_ms),
            max_attempts: self.max_reconnect_attempts,
        }
    }
}
