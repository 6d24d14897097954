//! FIELDCACHE Storage - Read-Through Field Cache
//!
//! Sits between a query executor's field resolution and a pluggable cache
//! store. The marshaling logic lives in [`cache`]; store backends live in
//! [`store`]; the logging sink lives in [`telemetry`].

pub mod cache;
pub mod store;
pub mod telemetry;

// Re-export the marshaling surface for executor integration
pub use cache::{
    CacheContext, CacheKey, CacheKeySource, CacheMarshal, Deconstructor, Deferred, Fetched,
    FieldResolver, JsonDeconstructor, Resolution, ResolveRequest,
};

// Re-export store types for host setup
pub use store::{CacheStats, CacheStore, InMemoryCacheStore, LmdbCacheError, LmdbCacheStore};

pub use telemetry::{init_tracing, CacheLogger, TracingLogger};

pub use fieldcache_core::{
    CacheError, CacheOptions, CacheResult, CacheSettings, Document, FieldCacheConfig,
};
