//! Read-through cache marshaling.
//!
//! A [`CacheMarshal`] is bound to one key. `read` decides between the store
//! and the resolve operation; `write` resolves, deconstructs and persists.
//! Nothing is retained between calls.
//!
//! ```text
//! START -> force? WRITE : LOOKUP
//! LOOKUP -> HIT (returns stored document)
//! LOOKUP -> MISS -> WRITE
//! WRITE -> RESOLVE -> deferred? DEFER-THEN-PERSIST : PERSIST -> DONE (returns result value)
//! ```
//!
//! Errors from the store, the resolve operation and the deconstructor reach
//! the caller unchanged. A failed store write fails the call even though the
//! value was already resolved.
//!
//! Concurrent misses on the same key are not coalesced: each call resolves
//! and writes independently, and the last write wins.

use std::sync::Arc;
use std::time::Duration;

use fieldcache_core::{CacheOptions, CacheResult, Document};

use super::context::CacheContext;
use super::deconstruct::{Deconstructor, JsonDeconstructor};
use super::deferred::Resolution;

/// What a read produced.
///
/// A hit carries the stored document untouched; everything else carries the
/// resolve operation's own result. The two never mix.
#[derive(Debug)]
pub enum Fetched<T> {
    /// The store held a document for the key.
    Hit(Document),
    /// The value came from the resolve operation (miss or forced read).
    Resolved(Resolution<T>),
}

impl<T> Fetched<T> {
    /// Returns true if the value came from the store.
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    /// Returns true if the resolve operation ran.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// The stored document of a hit.
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Hit(document) => Some(document),
            Self::Resolved(_) => None,
        }
    }

    /// The stored document of a hit.
    pub fn into_document(self) -> Option<Document> {
        match self {
            Self::Hit(document) => Some(document),
            Self::Resolved(_) => None,
        }
    }

    /// The resolve operation's result on a miss or forced read.
    pub fn into_resolution(self) -> Option<Resolution<T>> {
        match self {
            Self::Hit(_) => None,
            Self::Resolved(resolution) => Some(resolution),
        }
    }
}

/// Read-through marshal bound to a single cache key.
///
/// # Example
///
/// ```ignore
/// let fetched = ctx
///     .marshal("user:42")
///     .read(&CacheOptions::default(), false, || Ok(Resolution::ready(load_user(42)?)))
///     .await?;
/// ```
pub struct CacheMarshal<D = JsonDeconstructor> {
    key: String,
    ctx: CacheContext,
    deconstructor: Arc<D>,
}

impl CacheMarshal {
    /// Bind `key` to a context, deconstructing through `serde_json`.
    pub fn new(ctx: CacheContext, key: impl ToString) -> Self {
        Self::with_deconstructor(ctx, key, Arc::new(JsonDeconstructor))
    }
}

impl<D> CacheMarshal<D> {
    /// Bind `key` to a context with a custom deconstructor.
    pub fn with_deconstructor(ctx: CacheContext, key: impl ToString, deconstructor: Arc<D>) -> Self {
        Self {
            key: key.to_string(),
            ctx,
            deconstructor,
        }
    }

    /// The bound key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The expiry a write with `options` uses.
    pub fn expiry(&self, options: &CacheOptions) -> Duration {
        options.expiry_or(self.ctx.default_expiry())
    }

    /// Return the cached document, or resolve and persist on a miss.
    ///
    /// With `force`, the store is not consulted and the call behaves like
    /// [`CacheMarshal::write`]. `resolve` runs at most once, and exactly once
    /// on a miss or forced read.
    pub async fn read<T, F>(
        &self,
        options: &CacheOptions,
        force: bool,
        resolve: F,
    ) -> CacheResult<Fetched<T>>
    where
        T: Send + 'static,
        D: Deconstructor<T> + 'static,
        F: FnOnce() -> CacheResult<Resolution<T>>,
    {
        if force {
            return self.write(options, resolve).await.map(Fetched::Resolved);
        }

        match self.ctx.store().read(&self.key).await? {
            Some(document) => {
                self.ctx
                    .logger()
                    .debug(&format!("Cache hit: ({})", self.key));
                Ok(Fetched::Hit(document))
            }
            None => {
                self.ctx
                    .logger()
                    .debug(&format!("Cache miss: ({})", self.key));
                self.write(options, resolve).await.map(Fetched::Resolved)
            }
        }
    }

    /// Resolve, persist the deconstructed result and return the result.
    ///
    /// A deferred result is not awaited here: the returned handle persists
    /// the inner value once it is available and then yields that value.
    pub async fn write<T, F>(&self, options: &CacheOptions, resolve: F) -> CacheResult<Resolution<T>>
    where
        T: Send + 'static,
        D: Deconstructor<T> + 'static,
        F: FnOnce() -> CacheResult<Resolution<T>>,
    {
        let expiry = self.expiry(options);

        match resolve()? {
            Resolution::Ready(value) => {
                let document = self.deconstructor.perform(&value)?;
                self.ctx.store().write(&self.key, document, expiry).await?;
                Ok(Resolution::Ready(value))
            }
            Resolution::Deferred(deferred) => {
                let key = self.key.clone();
                let store = self.ctx.store_handle();
                let deconstructor = Arc::clone(&self.deconstructor);

                Ok(Resolution::Deferred(deferred.then(move |value| async move {
                    let document = deconstructor.perform(&value)?;
                    store.write(&key, document, expiry).await?;
                    Ok(value)
                })))
            }
        }
    }
}

impl<D> Clone for CacheMarshal<D> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            ctx: self.ctx.clone(),
            deconstructor: Arc::clone(&self.deconstructor),
        }
    }
}

impl<D> std::fmt::Debug for CacheMarshal<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheMarshal")
            .field("key", &self.key)
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}
