//! LMDB-backed cache store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a persistent,
//! memory-mapped key-value store for cached documents.
//!
//! # Value Format
//!
//! Every value is framed as `[expires_at_millis: i64 LE][json document]`.
//! The expiry is absolute wall-clock time so it survives process restarts.
//! An entry whose expiry has passed reads as absent and is deleted by that
//! read.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The store uses:
//! - Read transactions for `read` and `stats`
//! - Write transactions for `write`, `delete`, `clear` and expiry eviction
//! - Hit/miss/eviction counters behind a `RwLock`

use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fieldcache_core::{CacheError, CacheResult, Document, StoreError};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use super::traits::{CacheStats, CacheStore};

const HEADER_LEN: usize = 8;

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convert LmdbCacheError to CacheError.
impl From<LmdbCacheError> for CacheError {
    fn from(e: LmdbCacheError) -> Self {
        CacheError::Store(StoreError::Backend {
            reason: e.to_string(),
        })
    }
}

/// LMDB-backed cache store.
///
/// # Example
///
/// ```ignore
/// use fieldcache_storage::store::LmdbCacheStore;
///
/// let store = LmdbCacheStore::new("/tmp/fieldcache", 100)?;
/// store.write("user:42", json!({"name": "Ada"}), Duration::from_secs(60)).await?;
/// let cached = store.read("user:42").await?;
/// ```
pub struct LmdbCacheStore {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    /// Hit/miss/eviction counters.
    stats: RwLock<CacheStats>,
}

impl LmdbCacheStore {
    /// Create a new LMDB cache store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        // Ensure directory exists
        std::fs::create_dir_all(&path)?;

        // Open LMDB environment
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        // Open the default database
        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            stats: RwLock::new(CacheStats::default()),
        })
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        if let Ok(mut stats) = self.stats.write() {
            update(&mut stats);
        }
    }

    /// Absolute expiry in epoch millis; saturates for expiries beyond chrono's range.
    fn expires_at_millis(expiry: Duration) -> i64 {
        let now = Utc::now();
        chrono::Duration::from_std(expiry)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .map(|at| at.timestamp_millis())
            .unwrap_or(i64::MAX)
    }

    fn encode(document: &Document, expiry: Duration) -> Result<Vec<u8>, LmdbCacheError> {
        let value_bytes = serde_json::to_vec(document)
            .map_err(|e| LmdbCacheError::Serialization(e.to_string()))?;

        let mut full_bytes = Vec::with_capacity(HEADER_LEN + value_bytes.len());
        full_bytes.extend_from_slice(&Self::expires_at_millis(expiry).to_le_bytes());
        full_bytes.extend_from_slice(&value_bytes);
        Ok(full_bytes)
    }

    /// Split a stored value into its expiry and raw document bytes.
    fn decode(bytes: &[u8]) -> Result<(i64, &[u8]), LmdbCacheError> {
        if bytes.len() < HEADER_LEN {
            return Err(LmdbCacheError::Deserialization(
                "value shorter than expiry header".into(),
            ));
        }
        let header: [u8; HEADER_LEN] = bytes[0..HEADER_LEN]
            .try_into()
            .map_err(|_| LmdbCacheError::Deserialization("Invalid expiry header".into()))?;
        Ok((i64::from_le_bytes(header), &bytes[HEADER_LEN..]))
    }

    fn delete_key(&self, key: &str) -> Result<bool, LmdbCacheError> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let deleted = self
            .db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(deleted)
    }

    /// Remove `key` if the stored entry is still expired at `now_millis`.
    ///
    /// The check and the delete share one write transaction. When another
    /// writer replaced the entry after the caller's read transaction closed,
    /// the live bytes are returned and nothing is deleted.
    fn evict_expired(
        &self,
        key: &str,
        now_millis: i64,
    ) -> Result<Option<Vec<u8>>, LmdbCacheError> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let current = self
            .db
            .get(&wtxn, key.as_bytes())
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?
            .map(|bytes| bytes.to_vec());

        let Some(bytes) = current else {
            return Ok(None);
        };

        let (expires_at, _) = LmdbCacheStore::decode(&bytes)?;
        if now_millis < expires_at {
            wtxn.abort();
            return Ok(Some(bytes));
        }

        self.db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        self.record(|s| s.evictions += 1);
        Ok(None)
    }
}

#[async_trait]
impl CacheStore for LmdbCacheStore {
    async fn read(&self, key: &str) -> CacheResult<Option<Document>> {
        // Copy the value out so the read transaction is closed before any eviction
        let stored = {
            let rtxn = self
                .env
                .read_txn()
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

            let found = self
                .db
                .get(&rtxn, key.as_bytes())
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
            found.map(|bytes| bytes.to_vec())
        };

        let Some(bytes) = stored else {
            self.record(|s| s.misses += 1);
            return Ok(None);
        };

        let (expires_at, _) = LmdbCacheStore::decode(&bytes)?;
        let now_millis = Utc::now().timestamp_millis();
        let live = if now_millis >= expires_at {
            self.evict_expired(key, now_millis)?
        } else {
            Some(bytes)
        };

        let Some(bytes) = live else {
            self.record(|s| s.misses += 1);
            return Ok(None);
        };

        let (_, payload) = LmdbCacheStore::decode(&bytes)?;
        let document: Document = serde_json::from_slice(payload)
            .map_err(|e| LmdbCacheError::Deserialization(e.to_string()))?;
        self.record(|s| s.hits += 1);
        Ok(Some(document))
    }

    async fn write(&self, key: &str, document: Document, expiry: Duration) -> CacheResult<()> {
        let full_bytes = LmdbCacheStore::encode(&document, expiry)?;

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        self.db
            .put(&mut wtxn, key.as_bytes(), &full_bytes)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        Ok(self.delete_key(key)?)
    }

    async fn clear(&self) -> CacheResult<u64> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let removed = self
            .db
            .len(&wtxn)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        self.db
            .clear(&mut wtxn)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(removed)
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let entry_count = self
            .db
            .len(&rtxn)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let counters = self.stats.read().map(|s| s.clone()).unwrap_or_default();
        Ok(CacheStats {
            entry_count,
            memory_bytes: 0, // mapped size is not tracked per entry
            ..counters
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    fn create_test_store() -> (LmdbCacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store =
            LmdbCacheStore::new(temp_dir.path(), 10).expect("store creation should succeed");
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_write_and_read_document() {
        let (store, _dir) = create_test_store();

        store
            .write("user:42", json!({"name": "Ada"}), HOUR)
            .await
            .expect("write should succeed");

        let read = store.read("user:42").await.expect("read should succeed");
        assert_eq!(read, Some(json!({"name": "Ada"})));
    }

    #[tokio::test]
    async fn test_missing_key_is_absent() {
        let (store, _dir) = create_test_store();
        let read = store.read("nope").await.expect("read should succeed");
        assert_eq!(read, None);

        let stats = store.stats().await.expect("stats should succeed");
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[tokio::test]
    async fn test_null_document_is_present() {
        let (store, _dir) = create_test_store();
        store.write("nothing", json!(null), HOUR).await.unwrap();
        assert_eq!(store.read("nothing").await.unwrap(), Some(json!(null)));
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted_on_read() {
        let (store, _dir) = create_test_store();
        store.write("k", json!(1), Duration::ZERO).await.unwrap();

        assert_eq!(store.read("k").await.unwrap(), None);
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.entry_count, 0);
    }

    #[tokio::test]
    async fn test_eviction_keeps_entry_rewritten_after_expiry_check() {
        let (store, _dir) = create_test_store();
        store.write("k", json!("stale"), Duration::ZERO).await.unwrap();
        let checked_at = Utc::now().timestamp_millis();

        // a refresh commits between the read transaction and the eviction
        store.write("k", json!("fresh"), HOUR).await.unwrap();

        let live = store
            .evict_expired("k", checked_at)
            .expect("eviction should succeed");
        assert!(live.is_some());
        assert_eq!(store.read("k").await.unwrap(), Some(json!("fresh")));
        assert_eq!(store.stats().await.unwrap().evictions, 0);
    }

    #[tokio::test]
    async fn test_eviction_removes_entry_still_expired() {
        let (store, _dir) = create_test_store();
        store.write("k", json!("stale"), Duration::ZERO).await.unwrap();

        let live = store
            .evict_expired("k", Utc::now().timestamp_millis())
            .expect("eviction should succeed");
        assert!(live.is_none());
        assert_eq!(store.stats().await.unwrap().entry_count, 0);
        assert!(store.evict_expired("k", 0).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_huge_expiry_saturates() {
        let (store, _dir) = create_test_store();
        store.write("k", json!("kept"), Duration::MAX).await.unwrap();
        assert_eq!(store.read("k").await.unwrap(), Some(json!("kept")));
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let (store, _dir) = create_test_store();
        store.write("a", json!(1), HOUR).await.unwrap();
        store.write("b", json!(2), HOUR).await.unwrap();

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert_eq!(store.stats().await.unwrap().entry_count, 1);

        assert_eq!(store.clear().await.unwrap(), 1);
        assert_eq!(store.read("b").await.unwrap(), None);
    }

    #[test]
    fn test_decode_rejects_short_values() {
        assert!(matches!(
            LmdbCacheStore::decode(&[1, 2, 3]),
            Err(LmdbCacheError::Deserialization(_))
        ));
    }

    #[test]
    fn test_lmdb_error_converts_to_store_error() {
        let err: CacheError = LmdbCacheError::Transaction("boom".into()).into();
        assert!(matches!(err, CacheError::Store(StoreError::Backend { .. })));
    }
}
