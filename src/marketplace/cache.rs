//! Metadata Cache
//!
//! Resolve-once store for token metadata keyed by `<contract>-<token id>`.
//! Successful and fallback results are both kept for the lifetime of the
//! process so a failing item is never retried on every page load.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::Metadata;

/// Thread-safe write-once metadata store shared by all enrichment tasks.
#[derive(Default)]
pub struct MetadataCache {
    /// cache key -> metadata
    entries: RwLock<HashMap<String, Metadata>>,
    /// contract address -> collection display name
    collection_names: RwLock<HashMap<String, String>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up cached metadata, counting the hit or miss.
    pub async fn get(&self, key: &str) -> Option<Metadata> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(metadata) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(metadata.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store `metadata` under `key` unless the key is already present.
    /// Returns the value that is cached after the call, which is the earlier
    /// value when another resolution got there first.
    pub async fn insert(&self, key: String, metadata: Metadata) -> Metadata {
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(&key) {
            debug!("Cache key {} already resolved, keeping first value", key);
            return existing.clone();
        }
        entries.insert(key, metadata.clone());
        metadata
    }

    pub async fn collection_name(&self, contract: &str) -> Option<String> {
        self.collection_names.read().await.get(contract).cloned()
    }

    /// Remember a contract's display name. First write wins.
    pub async fn remember_collection_name(&self, contract: &str, name: &str) {
        let mut names = self.collection_names.write().await;
        names
            .entry(contract.to_string())
            .or_insert_with(|| name.to_string());
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.read().await.len(),
            collections: self.collection_names.read().await.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub collections: usize,
    pub hits: u64,
    pub misses: u64,
}
