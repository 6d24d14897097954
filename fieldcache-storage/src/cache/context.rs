//! Explicit cache context.
//!
//! Bundles the store, the logger and the process defaults that every marshal
//! needs. A context is built once at startup and cloned into whatever needs
//! it; clones share the same store and logger.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use fieldcache_core::{CacheResult, CacheSettings};

use super::marshal::CacheMarshal;
use crate::store::CacheStore;
use crate::telemetry::{CacheLogger, TracingLogger};

/// Shared, read-only collaborators for cache marshaling.
#[derive(Clone)]
pub struct CacheContext {
    store: Arc<dyn CacheStore>,
    logger: Arc<dyn CacheLogger>,
    settings: Arc<CacheSettings>,
}

impl CacheContext {
    /// Bind a store to validated settings, logging through `tracing`.
    pub fn new(settings: CacheSettings, store: Arc<dyn CacheStore>) -> CacheResult<Self> {
        settings.validate()?;
        Ok(Self {
            store,
            logger: Arc::new(TracingLogger),
            settings: Arc::new(settings),
        })
    }

    /// Replace the logger.
    pub fn with_logger(mut self, logger: Arc<dyn CacheLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// The bound cache store.
    pub fn store(&self) -> &dyn CacheStore {
        self.store.as_ref()
    }

    /// A shared handle to the bound cache store.
    pub fn store_handle(&self) -> Arc<dyn CacheStore> {
        Arc::clone(&self.store)
    }

    /// The bound logger.
    pub fn logger(&self) -> &dyn CacheLogger {
        self.logger.as_ref()
    }

    /// Expiry applied when a call does not override it.
    pub fn default_expiry(&self) -> Duration {
        self.settings.default_expiry
    }

    /// Prefix for generated cache keys.
    pub fn namespace(&self) -> &str {
        &self.settings.namespace
    }

    /// The settings this context was built from.
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Marshal bound to `key`. Same as `CacheMarshal::new(self.clone(), key)`.
    pub fn marshal(&self, key: impl ToString) -> CacheMarshal {
        CacheMarshal::new(self.clone(), key)
    }
}

impl fmt::Debug for CacheContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheContext")
            .field("store", &"<CacheStore>")
            .field("logger", &"<CacheLogger>")
            .field("settings", &self.settings)
            .finish()
    }
}
