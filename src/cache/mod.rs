//! Offline asset cache.
//!
//! A cache-first layer in front of the bot's web server: a fixed manifest of
//! page assets is fetched into a named bucket at install time and served
//! from there afterwards, with everything else falling through to the
//! network.
//!
//! - `storage`: named buckets keyed by request identity
//! - `worker`:  install / activate / fetch lifecycle
//! - `network`: the `Network` trait and its reqwest implementation
//! - `proxy`:   axum server that routes every request through the worker

pub mod network;
pub mod proxy;
pub mod storage;
pub mod worker;

use bytes::Bytes;
use std::fmt;

use crate::types::{DashboardError, Result};

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Paths pre-fetched at install. Non-empty, absolute, duplicate-free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheManifest {
    urls: Vec<String>,
}

impl CacheManifest {
    /// Validate and normalise a list of paths. Order is kept; repeats dropped.
    pub fn new<I, S>(urls: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for url in urls {
            let url = url.into().trim().to_string();
            if !url.starts_with('/') {
                return Err(DashboardError::InvalidManifest(format!(
                    "entry {url:?} is not an absolute path"
                )));
            }
            if !out.contains(&url) {
                out.push(url);
            }
        }
        if out.is_empty() {
            return Err(DashboardError::InvalidManifest("manifest is empty".into()));
        }
        Ok(Self { urls: out })
    }

    /// Everything a full offline reload of the dashboard needs.
    pub fn canonical() -> Self {
        Self {
            urls: [
                "/",
                "/index.html",
                "/main.js",
                "/manifest.json",
                "/service-worker.js",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Requests and responses
// ---------------------------------------------------------------------------

/// Exact identity of a request for cache matching: method plus path and query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub method: String,
    pub path_and_query: String,
}

impl RequestKey {
    pub fn get(path_and_query: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            path_and_query: path_and_query.into(),
        }
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path_and_query)
    }
}

/// A request intercepted from the page.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub key: RequestKey,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ProxyRequest {
    pub fn get(path_and_query: impl Into<String>) -> Self {
        Self {
            key: RequestKey::get(path_and_query),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }
}

/// A response as stored in, and replayed from, the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
