//! Cache store trait and usage statistics.
//!
//! This module defines the contract every cache backend implements. The
//! marshal only ever reads and writes; the remaining operations exist for
//! hosts that manage the store directly.

use std::time::Duration;

use async_trait::async_trait;
use fieldcache_core::{CacheResult, Document};

/// Cache store trait for pluggable cache implementations.
///
/// This trait abstracts over different cache backends (e.g., LMDB, Redis,
/// in-memory). Implementations should be thread-safe and support concurrent
/// access.
///
/// # Absence
///
/// `read` returns `Ok(None)` only when nothing is stored under the key (or
/// the entry has expired). A stored `null`, `false`, `0` or empty string is a
/// present value and must come back as `Some`, otherwise callers would see
/// false misses.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a document from the store.
    async fn read(&self, key: &str) -> CacheResult<Option<Document>>;

    /// Put a document into the store, replacing any previous entry.
    ///
    /// The entry stops being readable once `expiry` has elapsed.
    async fn write(&self, key: &str, document: Document, expiry: Duration) -> CacheResult<()>;

    /// Remove a single entry. Returns true if something was removed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Remove every entry. Returns the number of entries removed.
    async fn clear(&self) -> CacheResult<u64>;

    /// Get store statistics.
    async fn stats(&self) -> CacheResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of reads that found a live entry.
    pub hits: u64,
    /// Number of reads that found nothing (or an expired entry).
    pub misses: u64,
    /// Number of entries currently held.
    pub entry_count: u64,
    /// Approximate memory usage in bytes.
    pub memory_bytes: u64,
    /// Number of entries dropped because they expired.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
