//! FIELDCACHE Core - Shared Types
//!
//! Error taxonomy, per-call cache options and process-wide defaults.
//! Every other crate in the workspace depends on this one; it carries no
//! store or marshaling behavior of its own.

pub mod config;
pub mod error;

pub use config::{
    CacheOptions, CacheSettings, FieldCacheConfig, DEFAULT_EXPIRY, DEFAULT_NAMESPACE,
    ENV_DEFAULT_EXPIRY_SECS, ENV_NAMESPACE,
};
pub use error::{
    CacheError, CacheResult, ConfigError, DeconstructError, ResolveError, StoreError,
};

/// Cache-safe representation of a resolved value.
///
/// Documents are what the store persists and what a cache hit hands back.
/// Nothing in this workspace reconstructs a domain value from a document;
/// that happens downstream of the cache.
pub type Document = serde_json::Value;
