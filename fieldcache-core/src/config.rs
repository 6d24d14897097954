//! Configuration types
//!
//! `CacheSettings` holds the process-wide defaults (namespace, default expiry)
//! that are built once at startup and injected into every cache context.
//! `CacheOptions` is the per-call override a field declares, and
//! `FieldCacheConfig` is the typed form of the loose cache metadata a query
//! framework attaches to a field.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::ConfigError;

/// Namespace prefix used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "fieldcache";

/// Expiry applied to store writes when a call does not override it (90 minutes).
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(5400);

/// Environment variable overriding the key namespace.
pub const ENV_NAMESPACE: &str = "FIELDCACHE_NAMESPACE";

/// Environment variable overriding the default expiry, in whole seconds.
pub const ENV_DEFAULT_EXPIRY_SECS: &str = "FIELDCACHE_DEFAULT_EXPIRY_SECS";

const EXPIRY_FIELD: &str = "expiry";

// ============================================================================
// PROCESS DEFAULTS
// ============================================================================

/// Process-wide cache defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Prefix for every generated cache key.
    pub namespace: String,
    /// Expiry used when a call carries no `expiry` option.
    pub default_expiry: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_expiry: DEFAULT_EXPIRY,
        }
    }
}

impl CacheSettings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create CacheSettings from environment variables.
    ///
    /// Environment variables:
    /// - `FIELDCACHE_NAMESPACE`: key namespace (default: "fieldcache")
    /// - `FIELDCACHE_DEFAULT_EXPIRY_SECS`: default expiry in seconds (default: 5400)
    ///
    /// Absent or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let namespace = lookup(ENV_NAMESPACE)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let default_expiry = lookup(ENV_DEFAULT_EXPIRY_SECS)
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_EXPIRY);

        Self {
            namespace,
            default_expiry,
        }
    }

    /// Set the key namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the default expiry.
    pub fn with_default_expiry(mut self, expiry: Duration) -> Self {
        self.default_expiry = expiry;
        self
    }

    /// Check the settings before they are bound to a context.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "namespace".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// PER-CALL OPTIONS
// ============================================================================

/// Options recognized for a single read or write.
///
/// Absent fields fall back to the process defaults at the point of use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Overrides the default expiry for this call.
    pub expiry: Option<Duration>,
}

impl CacheOptions {
    /// Options with every field absent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the expiry override.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// The expiry to write with, given the process default.
    pub fn expiry_or(&self, default: Duration) -> Duration {
        self.expiry.unwrap_or(default)
    }

    /// Read options out of loosely typed field metadata.
    ///
    /// Only a JSON object is inspected; any other value yields the defaults.
    /// Inside an object, `expiry` is a number of seconds. A `null` expiry is
    /// treated as absent.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let Some(map) = value.as_object() else {
            return Ok(Self::default());
        };

        match map.get(EXPIRY_FIELD) {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(raw) => parse_expiry(raw).map(|expiry| Self {
                expiry: Some(expiry),
            }),
        }
    }
}

fn parse_expiry(raw: &Value) -> Result<Duration, ConfigError> {
    if let Some(secs) = raw.as_u64() {
        return Ok(Duration::from_secs(secs));
    }

    raw.as_f64()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| ConfigError::InvalidValue {
            field: EXPIRY_FIELD.to_string(),
            value: raw.to_string(),
            reason: "must be a non-negative number of seconds".to_string(),
        })
}

// ============================================================================
// FIELD METADATA
// ============================================================================

/// Whether a field is cached, and with which options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldCacheConfig {
    /// The field resolves directly, without touching the store.
    #[default]
    Disabled,
    /// The field goes through the read-through cache.
    Enabled(CacheOptions),
}

impl FieldCacheConfig {
    /// Enabled with default options.
    pub fn enabled() -> Self {
        Self::Enabled(CacheOptions::default())
    }

    /// Interpret the `cache` metadata a framework attached to a field.
    ///
    /// - absent, `null` or `false` disables caching
    /// - an object enables caching with the options it carries
    /// - any other value enables caching with default options
    pub fn from_value(value: Option<&Value>) -> Result<Self, ConfigError> {
        match value {
            None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(Self::Disabled),
            Some(other) => CacheOptions::from_value(other).map(Self::Enabled),
        }
    }

    /// Returns true if the field is cached.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }

    /// The options of an enabled field.
    pub fn options(&self) -> Option<&CacheOptions> {
        match self {
            Self::Enabled(options) => Some(options),
            Self::Disabled => None,
        }
    }
}
