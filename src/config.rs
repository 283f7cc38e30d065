//! Configuration loading from TOML.
//!
//! Reads `botdash.toml` and deserializes into strongly-typed structs.
//! Every section and field has a default, so a missing or partial file
//! still yields a usable configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::cache::CacheManifest;
use crate::types::{DashboardError, Mode};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "botdash.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub poll: PollConfig,
    pub control: ControlConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BotConfig {
    /// Base URL of the bot's web server, e.g. `http://localhost:5000`.
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,
    /// Age after which the rendered status is flagged as stale.
    pub stale_after_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            stale_after_secs: 15,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ControlConfig {
    pub default_mode: Mode,
    pub default_config_path: Option<String>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            default_mode: Mode::Simulate,
            default_config_path: Some("config.json".to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// Bucket name prefix; the version is appended.
    pub name: String,
    /// Bump on every change to `manifest` so old buckets get evicted.
    pub version: u32,
    pub manifest: Vec<String>,
    pub listen_port: u16,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "tradebot".to_string(),
            version: 1,
            manifest: CacheManifest::canonical().urls().to_vec(),
            listen_port: 8080,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {path}"))?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject values that would make the client or worker misbehave.
    pub fn validate(&self) -> Result<(), DashboardError> {
        if self.bot.base_url.trim().is_empty() {
            return Err(DashboardError::Config("bot.base_url is empty".into()));
        }
        if self.poll.interval_secs == 0 {
            return Err(DashboardError::Config("poll.interval_secs must be > 0".into()));
        }
        if self.bot.request_timeout_secs == 0 {
            return Err(DashboardError::Config(
                "bot.request_timeout_secs must be > 0".into(),
            ));
        }
        if self.cache.name.trim().is_empty() {
            return Err(DashboardError::Config("cache.name is empty".into()));
        }
        CacheManifest::new(self.cache.manifest.clone())?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll.interval_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.poll.stale_after_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.bot.request_timeout_secs)
    }
}
