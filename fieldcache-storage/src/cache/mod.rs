//! Read-through cache marshaling for field resolution.
//!
//! Given a key and a resolve operation, a [`CacheMarshal`] returns the stored
//! document if there is one, and otherwise resolves, persists the
//! deconstructed result and returns the result itself.
//!
//! # Collaborators
//!
//! - [`CacheContext`] carries the store, the logger and the default expiry.
//!   It replaces process-wide globals: build it once, inject it everywhere.
//! - [`Deconstructor`] turns a result into a cache-safe document.
//! - [`Resolution`] tells the marshal whether the result is on hand or
//!   [`Deferred`]. Deferred results are persisted by a continuation once the
//!   inner value exists, and the caller still receives a deferred handle.
//!
//! # Example
//!
//! ```ignore
//! let ctx = CacheContext::new(CacheSettings::from_env(), Arc::new(InMemoryCacheStore::new()))?;
//!
//! let fetched = ctx
//!     .marshal("user:42")
//!     .read(&CacheOptions::default(), false, || {
//!         Ok(Resolution::deferred(async move { load_user(42).await }))
//!     })
//!     .await?;
//!
//! match fetched {
//!     Fetched::Hit(document) => respond_with(document),
//!     Fetched::Resolved(resolution) => respond_with(resolution.resolve().await?),
//! }
//! ```

pub mod context;
pub mod deconstruct;
pub mod deferred;
pub mod key;
pub mod marshal;
pub mod resolver;

pub use context::CacheContext;
pub use deconstruct::{Deconstructor, JsonDeconstructor};
pub use deferred::{Deferred, Resolution};
pub use key::{CacheKey, CacheKeySource, ROOT_OBJECT};
pub use marshal::{CacheMarshal, Fetched};
pub use resolver::{FieldResolver, ResolveRequest};
