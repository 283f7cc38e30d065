//! Status client for the bot's control surface.
//!
//! Defines the `BotApi` trait and the reqwest-backed `HttpBotClient`.
//! The dashboard controller, renderers and client-side state live in the
//! submodules.

pub mod dashboard;
pub mod render;
pub mod state;
pub mod view;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::types::{BotStatus, Command, CommandAck, DashboardError, Result, StartRequest};

/// Abstraction over the bot's HTTP control surface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BotApi: Send + Sync {
    /// `POST /api/start`. Any non-2xx answer is an error.
    async fn start(&self, request: &StartRequest) -> Result<CommandAck>;

    /// `POST /api/stop` with no body.
    async fn stop(&self) -> Result<CommandAck>;

    /// `GET /api/status`.
    async fn status(&self) -> Result<BotStatus>;
}

/// reqwest client for a bot listening at `base_url`.
pub struct HttpBotClient {
    http: Client,
    base_url: String,
}

impl HttpBotClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("botdash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DashboardError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Turn a control response into an ack, rejecting non-2xx.
    async fn read_ack(command: Command, resp: reqwest::Response) -> Result<CommandAck> {
        let status = resp.status();
        if !status.is_success() {
            return Err(DashboardError::ControlRejected {
                command,
                status: status.as_u16(),
            });
        }
        // The ack body is informational; tolerate bots that send none.
        let body = resp
            .bytes()
            .await
            .map_err(|e| DashboardError::Transport(e.to_string()))?;
        if body.is_empty() || status == StatusCode::NO_CONTENT {
            return Ok(CommandAck::default());
        }
        Ok(serde_json::from_slice(&body).unwrap_or_default())
    }
}

#[async_trait]
impl BotApi for HttpBotClient {
    async fn start(&self, request: &StartRequest) -> Result<CommandAck> {
        let url = self.url("/api/start");
        debug!(url = %url, mode = %request.mode, config = ?request.config, "Sending start");

        let resp = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| DashboardError::Transport(format!("start request failed: {e}")))?;

        Self::read_ack(Command::Start, resp).await
    }

    async fn stop(&self) -> Result<CommandAck> {
        let url = self.url("/api/stop");
        debug!(url = %url, "Sending stop");

        let resp = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| DashboardError::Transport(format!("stop request failed: {e}")))?;

        Self::read_ack(Command::Stop, resp).await
    }

    async fn status(&self) -> Result<BotStatus> {
        let url = self.url("/api/status");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| DashboardError::Transport(format!("status request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DashboardError::Transport(format!(
                "status endpoint returned {status}: {body}"
            )));
        }

        resp.json::<BotStatus>()
            .await
            .map_err(|e| DashboardError::Decode(format!("status payload: {e}")))
    }
}
