//! Error types for FIELDCACHE operations

use thiserror::Error;

/// Cache store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Read failed for key {key}: {reason}")]
    ReadFailed { key: String, reason: String },

    #[error("Write failed for key {key}: {reason}")]
    WriteFailed { key: String, reason: String },

    #[error("Delete failed for key {key}: {reason}")]
    DeleteFailed { key: String, reason: String },

    #[error("Backend error: {reason}")]
    Backend { reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Errors raised while turning a resolved value into a storable document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeconstructError {
    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },
}

/// Application-level failures of a resolve operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Resolve failed: {reason}")]
    Failed { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all FIELDCACHE errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Deconstruct error: {0}")]
    Deconstruct(#[from] DeconstructError),

    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl CacheError {
    /// Shorthand for a failed resolve operation.
    pub fn resolve_failed(reason: impl Into<String>) -> Self {
        ResolveError::Failed {
            reason: reason.into(),
        }
        .into()
    }
}

/// Result type alias for FIELDCACHE operations.
pub type CacheResult<T> = Result<T, CacheError>;

// =============================================================================
// TESTS
// =============================================================================
