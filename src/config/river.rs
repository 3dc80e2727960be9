// src/config/river.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::fetch::RetrievalStrategy;

pub const ENV_RIVER_CONFIG_PATH: &str = "RIVER_CONFIG_PATH";
pub const DEFAULT_RIVER_TOML: &str = "config/river.toml";
pub const DEFAULT_RIVER_JSON: &str = "config/river.json";

const DEFAULT_FEEDS: [&str; 3] = [
    "https://www.theverge.com/rss/index.xml",
    "https://www.theguardian.com/world/rss",
    "https://www.wired.com/feed/rss",
];

fn default_strategies() -> Vec<RetrievalStrategy> {
    vec![
        RetrievalStrategy::Direct,
        RetrievalStrategy::relay("https://api.allorigins.win/raw"),
        RetrievalStrategy::relay("https://corsproxy.io/"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: format!("feed-river/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout_secs: 4,
            timeout_secs: 10,
        }
    }
}

/// Auto-scroll tuning. Durations are milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Pixels per frame; may be fractional.
    pub speed_px_per_frame: f64,
    /// Quiet period after an interaction before drift resumes.
    pub pause_ms: u64,
    /// Longer grace after a deliberate jump to start/end.
    pub jump_grace_ms: u64,
    pub nav_step_px: i64,
    pub frame_ms: u64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            speed_px_per_frame: 0.5,
            pause_ms: 2_000,
            jump_grace_ms: 4_000,
            nav_step_px: 400,
            frame_ms: 16,
        }
    }
}

impl DriftConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    pub fn jump_grace(&self) -> Duration {
        Duration::from_millis(self.jump_grace_ms)
    }

    pub fn frame(&self) -> Duration {
        Duration::from_millis(self.frame_ms)
    }

    /// Replace unusable values with defaults.
    fn sanitized(mut self) -> Self {
        let d = Self::default();
        if !self.speed_px_per_frame.is_finite() || self.speed_px_per_frame <= 0.0 {
            self.speed_px_per_frame = d.speed_px_per_frame;
        }
        if self.pause_ms == 0 {
            self.pause_ms = d.pause_ms;
        }
        if self.jump_grace_ms == 0 {
            self.jump_grace_ms = d.jump_grace_ms;
        }
        if self.nav_step_px <= 0 {
            self.nav_step_px = d.nav_step_px;
        }
        if self.frame_ms == 0 {
            self.frame_ms = d.frame_ms;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiverConfig {
    /// Feed URLs, in display order.
    pub feeds: Vec<String>,
    /// Retrieval strategies, tried in order for every feed.
    pub strategies: Vec<RetrievalStrategy>,
    pub http: HttpSettings,
    /// Refetch interval; 0 runs a single cycle.
    pub refresh_secs: u64,
    pub drift: DriftConfig,
}

impl Default for RiverConfig {
    fn default() -> Self {
        Self {
            feeds: DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            strategies: default_strategies(),
            http: HttpSettings::default(),
            refresh_secs: 0,
            drift: DriftConfig::default(),
        }
    }
}

impl RiverConfig {
    fn sanitized(mut self) -> Self {
        self.feeds = clean_feeds(self.feeds);
        self.drift = self.drift.sanitized();
        if self.http.timeout_secs == 0 {
            self.http.timeout_secs = HttpSettings::default().timeout_secs;
        }
        if self.http.connect_timeout_secs == 0 {
            self.http.connect_timeout_secs = HttpSettings::default().connect_timeout_secs;
        }
        self
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_river_config_from(path: &Path) -> Result<RiverConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading river config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_river_config(&content, ext.as_str())
        .with_context(|| format!("parsing river config {}", path.display()))
}

/// Load config using env var + fallbacks:
/// 1) $RIVER_CONFIG_PATH
/// 2) config/river.toml
/// 3) config/river.json
/// 4) built-in defaults
pub fn load_river_config_default() -> Result<RiverConfig> {
    if let Ok(p) = std::env::var(ENV_RIVER_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_river_config_from(&pb);
        } else {
            return Err(anyhow!("RIVER_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from(DEFAULT_RIVER_TOML);
    if toml_p.exists() {
        return load_river_config_from(&toml_p);
    }
    let json_p = PathBuf::from(DEFAULT_RIVER_JSON);
    if json_p.exists() {
        return load_river_config_from(&json_p);
    }
    Ok(RiverConfig::default())
}

fn parse_river_config(s: &str, hint_ext: &str) -> Result<RiverConfig> {
    let cfg = match hint_ext {
        "toml" => toml::from_str::<RiverConfig>(s)?,
        "json" => serde_json::from_str::<RiverConfig>(s)?,
        // No usable extension: JSON documents start with '{'.
        _ if s.trim_start().starts_with('{') => serde_json::from_str::<RiverConfig>(s)?,
        _ => toml::from_str::<RiverConfig>(s)?,
    };
    Ok(cfg.sanitized())
}

/// Trim, drop blanks, keep order.
fn clean_feeds(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
