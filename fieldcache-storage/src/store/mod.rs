//! Cache stores.
//!
//! The marshal talks to storage only through [`CacheStore`]. Two backends are
//! provided: [`InMemoryCacheStore`] for single-process use and tests, and
//! [`LmdbCacheStore`] for a persistent, memory-mapped cache that outlives the
//! process.

pub mod lmdb_backend;
pub mod memory;
pub mod traits;

pub use lmdb_backend::{LmdbCacheError, LmdbCacheStore};
pub use memory::InMemoryCacheStore;
pub use traits::{CacheStats, CacheStore};
