//! Offline cache worker: install, activate, intercept.
//!
//! Lifecycle: `Parsed → Installing → Installed → Activated`, or
//! `Redundant` when install fails. Install is all-or-nothing: every
//! manifest entry is fetched before anything is committed, and a single
//! failed fetch or non-2xx answer leaves no trace in storage.
//!
//! The bucket name carries the cache version. Activation evicts every
//! other bucket with the same prefix, so bumping the version on redeploy
//! is enough to drop stale assets.

use futures::future::try_join_all;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, warn};

use super::network::Network;
use super::storage::CacheStorage;
use super::{CacheManifest, CachedResponse, ProxyRequest, RequestKey};
use crate::config::CacheConfig;
use crate::types::{DashboardError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activated,
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        write!(f, "{s}")
    }
}

/// Hit/miss counters since start-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

pub struct OfflineCacheWorker {
    storage: Arc<CacheStorage>,
    network: Arc<dyn Network>,
    prefix: String,
    bucket: String,
    manifest: CacheManifest,
    state: RwLock<WorkerState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl OfflineCacheWorker {
    pub fn new(
        storage: Arc<CacheStorage>,
        network: Arc<dyn Network>,
        prefix: &str,
        version: u32,
        manifest: CacheManifest,
    ) -> Self {
        Self {
            storage,
            network,
            prefix: prefix.to_string(),
            bucket: format!("{prefix}-v{version}"),
            manifest,
            state: RwLock::new(WorkerState::Parsed),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(
        cfg: &CacheConfig,
        storage: Arc<CacheStorage>,
        network: Arc<dyn Network>,
    ) -> Result<Self> {
        let manifest = CacheManifest::new(cfg.manifest.clone())?;
        Ok(Self::new(storage, network, &cfg.name, cfg.version, manifest))
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: WorkerState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = next;
    }

    /// Move `from -> to` under a single write guard, or fail without moving.
    fn transition(&self, from: WorkerState, to: WorkerState, operation: &str) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if *state != from {
            return Err(DashboardError::Lifecycle {
                state: state.to_string(),
                operation: operation.into(),
            });
        }
        *state = to;
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Fetch every manifest entry and commit them together.
    pub async fn install(&self) -> Result<()> {
        self.transition(WorkerState::Parsed, WorkerState::Installing, "install")?;

        let created = self.storage.open(&self.bucket).await;
        info!(
            bucket = %self.bucket,
            resources = self.manifest.len(),
            "Installing offline cache"
        );

        let fetches = self.manifest.urls().iter().map(|url| self.fetch_for_install(url));

        match try_join_all(fetches).await {
            Ok(entries) => {
                self.storage.commit(&self.bucket, entries).await;
                self.set_state(WorkerState::Installed);
                info!(bucket = %self.bucket, "Offline cache installed");
                Ok(())
            }
            Err(e) => {
                if created {
                    self.storage.delete(&self.bucket).await;
                }
                self.set_state(WorkerState::Redundant);
                error!(bucket = %self.bucket, error = %e, "Offline cache install failed");
                Err(e)
            }
        }
    }

    async fn fetch_for_install(&self, url: &str) -> Result<(RequestKey, CachedResponse)> {
        let request = ProxyRequest::get(url);
        let response = self
            .network
            .fetch(&request)
            .await
            .map_err(|e| DashboardError::InstallFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.is_success() {
            return Err(DashboardError::InstallFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status),
            });
        }

        debug!(url, bytes = response.body.len(), "Pre-cached");
        Ok((request.key, response))
    }

    /// Take control of fetches and evict buckets from older versions.
    /// Returns the names of the evicted buckets.
    pub async fn activate(&self) -> Result<Vec<String>> {
        self.transition(WorkerState::Installed, WorkerState::Activated, "activate")?;

        let family = format!("{}-", self.prefix);
        let mut evicted = Vec::new();
        for name in self.storage.names().await {
            if name != self.bucket && name.starts_with(&family) {
                self.storage.delete(&name).await;
                evicted.push(name);
            }
        }
        if !evicted.is_empty() {
            info!(evicted = ?evicted, "Evicted stale cache buckets");
        }

        info!(bucket = %self.bucket, "Offline cache active");
        Ok(evicted)
    }

    /// Cache-first: replay a cached response verbatim, or go to the network.
    ///
    /// Misses are never written back; the bucket only changes at install.
    pub async fn handle_fetch(&self, request: &ProxyRequest) -> Result<CachedResponse> {
        if self.state() == WorkerState::Activated && request.key.is_get() {
            if let Some(hit) = self.storage.lookup_in(&self.bucket, &request.key).await {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %request.key, "Cache hit");
                return Ok(hit);
            }
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %request.key, "Cache miss");
        }

        self.network.fetch(request).await.map_err(|e| {
            warn!(key = %request.key, error = %e, "Network fetch failed");
            e
        })
    }
}
