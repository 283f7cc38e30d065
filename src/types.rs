//! Shared types for botdash.
//!
//! The wire model of the bot's control surface, plus the error type used
//! by both the status client and the offline cache worker.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Bot status
// ---------------------------------------------------------------------------

/// Snapshot returned by `GET /api/status`.
///
/// Fetched fresh on every poll and never persisted. Every field except
/// `running` may be missing when the bot has not been started yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotStatus {
    #[serde(default)]
    pub running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggressiveness: Option<f64>,
    /// Server order, assumed chronological.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trades: Option<Vec<Trade>>,
}

impl BotStatus {
    /// Trades in server order; an absent list is treated as empty.
    pub fn trades(&self) -> &[Trade] {
        self.trades.as_deref().unwrap_or(&[])
    }
}

/// A single trade as reported by the bot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub pnl: f64,
    /// Missing means closed.
    #[serde(default)]
    pub open: bool,
}

// ---------------------------------------------------------------------------
// Control commands
// ---------------------------------------------------------------------------

/// Trading mode passed to `/api/start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Simulate,
    Live,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Simulate => write!(f, "simulate"),
            Mode::Live => write!(f, "live"),
        }
    }
}

impl FromStr for Mode {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simulate" => Ok(Mode::Simulate),
            "live" => Ok(Mode::Live),
            other => Err(DashboardError::InvalidMode(other.to_string())),
        }
    }
}

/// Body of `POST /api/start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartRequest {
    pub mode: Mode,
    /// Path of the bot-side config file. Omitted to let the bot use its default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
}

impl StartRequest {
    pub fn new(mode: Mode, config_path: Option<&str>) -> Self {
        let config = config_path
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        Self { mode, config }
    }
}

/// Acknowledgement body returned by `/api/start` and `/api/stop`.
///
/// Logged only. Bot state is learned from the next status poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandAck {
    #[serde(default)]
    pub status: String,
}

/// Control commands the client can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Start => write!(f, "start"),
            Command::Stop => write!(f, "stop"),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for botdash.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Bot rejected {command} command: HTTP {status}")]
    ControlRejected { command: Command, status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Cache install failed at {url}: {reason}")]
    InstallFailed { url: String, reason: String },

    #[error("Cache worker is {state}, cannot {operation}")]
    Lifecycle { state: String, operation: String },

    #[error("Invalid cache manifest: {0}")]
    InvalidManifest(String),

    #[error("Invalid mode: {0:?} (expected \"simulate\" or \"live\")")]
    InvalidMode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = DashboardError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
