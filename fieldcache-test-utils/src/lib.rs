//! FIELDCACHE Test Utilities
//!
//! Centralized test infrastructure for the FIELDCACHE workspace:
//! - Instrumented collaborators (store, logger) that record what the marshal did
//! - Call-counting resolve operations and externally completed deferred values
//! - Proptest generators for keys, documents and expiries
//! - Fixtures for a ready-to-use cache context

// Re-export the types tests touch most
pub use fieldcache_core::{
    CacheError, CacheOptions, CacheResult, CacheSettings, Document, FieldCacheConfig, StoreError,
};
pub use fieldcache_storage::{
    CacheContext, CacheLogger, CacheMarshal, CacheStats, CacheStore, Deferred, Fetched,
    InMemoryCacheStore, Resolution,
};

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

// ============================================================================
// RECORDING LOGGER
// ============================================================================

/// Logger that keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    messages: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message logged so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Returns true if any message equals `message`.
    pub fn contains(&self, message: &str) -> bool {
        self.messages().iter().any(|m| m == message)
    }
}

impl CacheLogger for RecordingLogger {
    fn debug(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

// ============================================================================
// INSTRUMENTED STORE
// ============================================================================

/// A write the store accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    pub key: String,
    pub document: Document,
    pub expiry: Duration,
}

/// In-memory store that records reads and writes and can be told to fail.
#[derive(Debug, Default)]
pub struct InstrumentedStore {
    inner: InMemoryCacheStore,
    reads: AtomicUsize,
    writes: Mutex<Vec<RecordedWrite>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InstrumentedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `read` calls, including failed ones.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Every successful write, oldest first.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// The most recent successful write.
    pub fn last_write(&self) -> Option<RecordedWrite> {
        self.writes().pop()
    }

    /// Make subsequent reads fail with a store error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail with a store error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Seed an entry without recording it as a write.
    ///
    /// Panics if the underlying store rejects the write.
    pub async fn seed(&self, key: &str, document: Document) {
        self.inner
            .write(key, document, Duration::from_secs(3600))
            .await
            .expect("in-memory write");
    }
}

#[async_trait]
impl CacheStore for InstrumentedStore {
    async fn read(&self, key: &str) -> CacheResult<Option<Document>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::ReadFailed {
                key: key.to_string(),
                reason: "injected read failure".to_string(),
            }
            .into());
        }
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, document: Document, expiry: Duration) -> CacheResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed {
                key: key.to_string(),
                reason: "injected write failure".to_string(),
            }
            .into());
        }
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(RecordedWrite {
                key: key.to_string(),
                document: document.clone(),
                expiry,
            });
        }
        self.inner.write(key, document, expiry).await
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        self.inner.delete(key).await
    }

    async fn clear(&self) -> CacheResult<u64> {
        self.inner.clear().await
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        self.inner.stats().await
    }
}

// ============================================================================
// RESOLVE HELPERS
// ============================================================================

/// Counts how many times the resolve operations it hands out were invoked.
#[derive(Debug, Clone, Default)]
pub struct ResolveCounter {
    calls: Arc<AtomicUsize>,
}

impl ResolveCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Resolve operation returning `value` immediately.
    pub fn ready<T>(&self, value: T) -> impl FnOnce() -> CacheResult<Resolution<T>>
    where
        T: Send + 'static,
    {
        let calls = Arc::clone(&self.calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Resolution::ready(value))
        }
    }

    /// Resolve operation returning a deferred handle that completes with `value`.
    pub fn deferred<T>(&self, value: T) -> impl FnOnce() -> CacheResult<Resolution<T>>
    where
        T: Send + 'static,
    {
        let calls = Arc::clone(&self.calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Resolution::Deferred(Deferred::ready(value)))
        }
    }

    /// Resolve operation that fails with a resolve error.
    pub fn failing<T>(&self, reason: &str) -> impl FnOnce() -> CacheResult<Resolution<T>>
    where
        T: Send + 'static,
    {
        let calls = Arc::clone(&self.calls);
        let reason = reason.to_string();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::resolve_failed(reason))
        }
    }
}

/// A deferred value completed from the outside.
///
/// Sending on the returned sender completes the handle; dropping it fails
/// the handle with a resolve error.
pub fn gated_deferred<T: Send + 'static>() -> (oneshot::Sender<T>, Deferred<T>) {
    let (tx, rx) = oneshot::channel();
    let deferred = Deferred::new(async move {
        rx.await
            .map_err(|_| CacheError::resolve_failed("gate dropped before completion"))
    });
    (tx, deferred)
}

// ============================================================================
// FIXTURES
// ============================================================================

/// A context wired to an instrumented store and a recording logger.
pub struct TestCache {
    pub ctx: CacheContext,
    pub store: Arc<InstrumentedStore>,
    pub logger: Arc<RecordingLogger>,
}

impl TestCache {
    /// Fixture with default settings.
    pub fn new() -> Self {
        Self::with_settings(CacheSettings::default())
    }

    /// Fixture with the given settings.
    ///
    /// Panics if the settings do not validate.
    pub fn with_settings(settings: CacheSettings) -> Self {
        let store = Arc::new(InstrumentedStore::new());
        let logger = Arc::new(RecordingLogger::new());
        let ctx = CacheContext::new(settings, store.clone())
            .expect("test settings should validate")
            .with_logger(logger.clone());
        Self { ctx, store, logger }
    }

    /// Marshal bound to `key`.
    pub fn marshal(&self, key: &str) -> CacheMarshal {
        self.ctx.marshal(key)
    }
}

impl Default for TestCache {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    /// Cache keys shaped like `type:id`.
    pub fn arb_cache_key() -> impl Strategy<Value = String> {
        ("[a-z]{1,12}", 0u32..100_000).prop_map(|(kind, id)| format!("{}:{}", kind, id))
    }

    /// Arbitrary JSON documents, nested up to a few levels.
    pub fn arb_document() -> impl Strategy<Value = Document> {
        let leaf = prop_oneof![
            Just(Document::Null),
            any::<bool>().prop_map(Document::from),
            any::<i64>().prop_map(Document::from),
            "[a-zA-Z0-9 ]{0,16}".prop_map(Document::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Document::Array),
                proptest::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|map| Document::Object(map.into_iter().collect())),
            ]
        })
    }

    /// Expiries between one second and one day.
    pub fn arb_expiry() -> impl Strategy<Value = Duration> {
        (1u64..86_400).prop_map(Duration::from_secs)
    }

    /// Options with or without an expiry override.
    pub fn arb_options() -> impl Strategy<Value = CacheOptions> {
        proptest::option::of(arb_expiry()).prop_map(|expiry| CacheOptions { expiry })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_instrumented_store_records_writes() {
        let store = InstrumentedStore::new();
        store
            .write("k", json!(1), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(
            store.last_write(),
            Some(RecordedWrite {
                key: "k".to_string(),
                document: json!(1),
                expiry: Duration::from_secs(5),
            })
        );
        assert_eq!(store.read("k").await.unwrap(), Some(json!(1)));
        assert_eq!(store.read_count(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = InstrumentedStore::new();
        store.fail_reads(true);
        store.fail_writes(true);

        assert!(matches!(
            store.read("k").await,
            Err(CacheError::Store(StoreError::ReadFailed { .. }))
        ));
        assert!(matches!(
            store.write("k", json!(1), Duration::from_secs(1)).await,
            Err(CacheError::Store(StoreError::WriteFailed { .. }))
        ));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_seed_is_not_recorded() {
        let store = InstrumentedStore::new();
        store.seed("k", json!("seeded")).await;
        assert!(store.writes().is_empty());
        assert_eq!(store.read("k").await.unwrap(), Some(json!("seeded")));
    }

    #[tokio::test]
    async fn test_seed_bypasses_injected_write_failures() {
        let store = InstrumentedStore::new();
        store.fail_writes(true);
        store.seed("k", json!(false)).await;
        assert_eq!(store.read("k").await.unwrap(), Some(json!(false)));
    }

    #[test]
    fn test_resolve_counter() {
        let counter = ResolveCounter::new();
        let op = counter.ready(5);
        assert_eq!(counter.calls(), 0);
        assert!(op().unwrap().is_ready());
        assert_eq!(counter.calls(), 1);

        assert!(counter.failing::<i32>("nope")().is_err());
        assert_eq!(counter.calls(), 2);
    }

    #[tokio::test]
    async fn test_gated_deferred() {
        let (tx, deferred) = gated_deferred();
        tx.send("done").unwrap();
        assert_eq!(deferred.await.unwrap(), "done");

        let (tx, deferred) = gated_deferred::<u8>();
        drop(tx);
        assert!(deferred.await.is_err());
    }

    #[test]
    fn test_recording_logger() {
        let logger = RecordingLogger::new();
        logger.debug("Cache hit: (k)");
        assert!(logger.contains("Cache hit: (k)"));
        assert_eq!(logger.messages().len(), 1);
    }
}
