//! Named cache buckets.
//!
//! Buckets are only ever written whole: `commit` replaces a bucket's
//! contents in one step under the write lock, so a reader never sees a
//! partially populated install.

use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::{CachedResponse, RequestKey};

type Bucket = HashMap<RequestKey, CachedResponse>;

#[derive(Default)]
pub struct CacheStorage {
    buckets: RwLock<HashMap<String, Bucket>>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the bucket if absent. Returns true when it was created.
    pub async fn open(&self, name: &str) -> bool {
        let mut buckets = self.buckets.write().await;
        if buckets.contains_key(name) {
            return false;
        }
        buckets.insert(name.to_string(), Bucket::new());
        debug!(bucket = name, "Cache bucket created");
        true
    }

    /// Add all entries to a bucket at once, creating it if needed.
    pub async fn commit(&self, name: &str, entries: Vec<(RequestKey, CachedResponse)>) {
        let mut buckets = self.buckets.write().await;
        let bucket = buckets.entry(name.to_string()).or_default();
        let count = entries.len();
        bucket.extend(entries);
        debug!(bucket = name, count, "Cache entries committed");
    }

    /// Look the key up in one bucket. Other buckets are never consulted.
    pub async fn lookup_in(&self, name: &str, key: &RequestKey) -> Option<CachedResponse> {
        let buckets = self.buckets.read().await;
        buckets.get(name).and_then(|b| b.get(key)).cloned()
    }

    pub async fn delete(&self, name: &str) -> bool {
        self.buckets.write().await.remove(name).is_some()
    }

    pub async fn has(&self, name: &str) -> bool {
        self.buckets.read().await.contains_key(name)
    }

    /// Bucket names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.buckets.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self, name: &str) -> usize {
        self.buckets
            .read()
            .await
            .get(name)
            .map(|b| b.len())
            .unwrap_or(0)
    }
}
