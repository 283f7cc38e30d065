//! Network access for the offline cache.
//!
//! `Network` is the seam between the worker and the upstream web server;
//! `HttpNetwork` forwards requests with reqwest.

use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::debug;

use super::{CachedResponse, ProxyRequest};
use crate::types::{DashboardError, Result};

/// Hop-by-hop headers that must not be forwarded in either direction.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

fn forwardable(name: &str) -> bool {
    !HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// A live fetch against the upstream server.
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch the request upstream. Non-2xx answers are returned, not errors.
    async fn fetch(&self, request: &ProxyRequest) -> Result<CachedResponse>;
}

pub struct HttpNetwork {
    http: Client,
    base_url: String,
}

impl HttpNetwork {
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
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &ProxyRequest) -> Result<CachedResponse> {
        let url = format!("{}{}", self.base_url, request.key.path_and_query);
        let method = Method::from_bytes(request.key.method.as_bytes())
            .map_err(|e| DashboardError::Transport(format!("bad method: {e}")))?;

        debug!(%method, url = %url, "Upstream fetch");

        let mut builder = self.http.request(method, &url);
        for (name, value) in request.headers.iter().filter(|(n, _)| forwardable(n)) {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| DashboardError::Transport(format!("{url}: {e}")))?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter(|(name, _)| forwardable(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = resp
            .bytes()
            .await
            .map_err(|e| DashboardError::Transport(format!("{url}: {e}")))?;

        Ok(CachedResponse {
            status,
            headers,
            body,
        })
    }
}
