use crate::{
    error::{DashError, DashResult},
    types::{ChannelName, SegmentName, ALL_SEGMENTS, MAX_WINDOW_DAYS},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ── Filter catalog ─────────────────────────────────────────────────

/// The fixed channel and segment catalogs the filter UI offers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterCatalog {
    pub channels: Vec<ChannelName>,
    pub segments: Vec<SegmentName>,
}

impl FilterCatalog {
    pub fn has_channel(&self, channel: &str) -> bool {
        self.channels.iter().any(|c| c == channel)
    }

    pub fn has_segment(&self, segment: &str) -> bool {
        self.segments.iter().any(|s| s == segment)
    }
}

impl Default for FilterCatalog {
    fn default() -> Self {
        Self {
            channels: ["Google Ads", "Meta", "Email", "Organic", "TikTok", "Influencers"]
                .into_iter()
                .map(String::from)
                .collect(),
            segments: [ALL_SEGMENTS, "New Customers", "Returning Customers", "High Value", "At Risk"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

// ── Development fallback ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub seed:       u64,
    /// Simulated network delay per fetch.
    pub latency_ms: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self { seed: 42, latency_ms: 500 }
    }
}

// ── Dispatch ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    Outbox,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub sink:        SinkKind,
    /// Required when `sink` is `http`.
    #[serde(default)]
    pub endpoint:    Option<String>,
    /// SQLite path for the outbox sink; ":memory:" keeps it in-process.
    #[serde(default = "default_outbox_path")]
    pub outbox_path: String,
    pub timeout_ms:  u64,
}

fn default_outbox_path() -> String {
    ":memory:".into()
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            sink:        SinkKind::Outbox,
            endpoint:    None,
            outbox_path: default_outbox_path(),
            timeout_ms:  10_000,
        }
    }
}

// ── Dashboard ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Base URL of the lifecycle API, e.g. "http://localhost:8080/api/lifecycle".
    /// Absent means every metric resolves through the synthetic generators.
    #[serde(default)]
    pub api_base:              Option<String>,
    pub fetch_timeout_ms:      u64,
    /// Successful query keys retained per metric before the oldest is evicted.
    pub cache_keys_per_metric: usize,
    /// Abort in-flight fetches whose key has been superseded.
    #[serde(default)]
    pub abort_superseded:      bool,
    pub default_window_days:   i64,
    #[serde(default)]
    pub catalog:               FilterCatalog,
    #[serde(default)]
    pub synthetic:             SyntheticConfig,
    #[serde(default)]
    pub dispatch:              DispatchConfig,
}

impl DashboardConfig {
    /// Load from a JSON file.
    /// In tests, use DashboardConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: DashboardConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            api_base:              None,
            fetch_timeout_ms:      30_000,
            cache_keys_per_metric: 4,
            abort_superseded:      false,
            default_window_days:   30,
            catalog:               FilterCatalog::default(),
            synthetic:             SyntheticConfig { seed: 7, latency_ms: 0 },
            dispatch:              DispatchConfig::default(),
        }
    }

    pub fn validate(&self) -> DashResult<()> {
        if self.catalog.channels.is_empty() {
            return Err(DashError::Config("channel catalog is empty".into()));
        }
        // `,` joins channels and `|` joins key fields.
        if let Some(name) = self.catalog.channels.iter().find(|c| c.contains([',', '|'])) {
            return Err(DashError::Config(format!(
                "channel '{name}' contains a reserved ',' or '|'"
            )));
        }
        if let Some(name) = self.catalog.segments.iter().find(|s| s.contains('|')) {
            return Err(DashError::Config(format!(
                "segment '{name}' contains a reserved '|'"
            )));
        }
        if !self.catalog.has_segment(ALL_SEGMENTS) {
            return Err(DashError::Config(format!(
                "segment catalog must contain '{ALL_SEGMENTS}'"
            )));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(DashError::Config("fetch_timeout_ms must be > 0".into()));
        }
        if self.cache_keys_per_metric == 0 {
            return Err(DashError::Config("cache_keys_per_metric must be > 0".into()));
        }
        if !(0..=MAX_WINDOW_DAYS).contains(&self.default_window_days) {
            return Err(DashError::Config(format!(
                "default_window_days must be within 0..={MAX_WINDOW_DAYS}"
            )));
        }
        if self.dispatch.sink == SinkKind::Http && self.dispatch.endpoint.is_none() {
            return Err(DashError::Config("http sink requires dispatch.endpoint".into()));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch.timeout_ms)
    }
}
