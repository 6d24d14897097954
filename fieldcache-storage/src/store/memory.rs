//! In-process cache store with per-entry expiry.
//!
//! Entries live in a `HashMap` behind a tokio `RwLock`. Reads share the lock;
//! only a read that finds an expired entry takes the write lock, re-checks
//! the entry and removes it, reporting a miss and counting an eviction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fieldcache_core::{CacheResult, Document};
use tokio::sync::RwLock;

use super::traits::{CacheStats, CacheStore};

#[derive(Debug, Clone)]
struct Entry {
    document: Document,
    /// `None` when the expiry overflowed `Instant`, i.e. effectively never.
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(document: Document, expiry: Duration) -> Self {
        Self {
            document,
            expires_at: Instant::now().checked_add(expiry),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    fn approximate_size(&self, key: &str) -> u64 {
        (key.len() + self.document.to_string().len()) as u64
    }
}

/// In-memory cache store.
///
/// A zero expiry is stored verbatim, so such an entry is already expired on
/// the next read.
///
/// # Example
///
/// ```ignore
/// let store = InMemoryCacheStore::new();
/// store.write("user:42", json!({"name": "Ada"}), Duration::from_secs(60)).await?;
/// assert!(store.read("user:42").await?.is_some());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl InMemoryCacheStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining lifetime of an entry, if it is present and live.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| {
                entry
                    .expires_at
                    .map(|at| at.saturating_duration_since(now))
                    .unwrap_or(Duration::MAX)
            })
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> u64 {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = (before - entries.len()) as u64;
        self.evictions.fetch_add(removed, Ordering::Relaxed);
        removed
    }

    /// Remove `key` if it is still expired under the write lock.
    ///
    /// Returns the live document when a write replaced the expired entry
    /// after the caller released its read lock.
    async fn evict_expired(&self, key: &str) -> Option<Document> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => Some(entry.document.clone()),
            Some(_) => {
                entries.remove(key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn read(&self, key: &str) -> CacheResult<Option<Document>> {
        let live = {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_expired(Instant::now()) => None,
                Some(entry) => Some(Some(entry.document.clone())),
                None => Some(None),
            }
        };

        // `None` here means the entry was expired under the read lock
        let found = match live {
            Some(found) => found,
            None => self.evict_expired(key).await,
        };

        match found {
            Some(document) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(document))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn write(&self, key: &str, document: Document, expiry: Duration) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), Entry::new(document, expiry));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(key).is_some())
    }

    async fn clear(&self) -> CacheResult<u64> {
        let mut entries = self.entries.write().await;
        let removed = entries.len() as u64;
        entries.clear();
        Ok(removed)
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let entries = self.entries.read().await;
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: entries.len() as u64,
            memory_bytes: entries
                .iter()
                .map(|(key, entry)| entry.approximate_size(key))
                .sum(),
            evictions: self.evictions.load(Ordering::Relaxed),
        })
    }
}
