//! Logging sink for cache events.
//!
//! The marshal reports hits and misses through [`CacheLogger`]. The default
//! sink forwards to `tracing`; hosts that want the events elsewhere inject
//! their own implementation into the cache context.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Target used for every event the default logger emits.
pub const LOG_TARGET: &str = "fieldcache";

/// Fire-and-forget debug sink.
///
/// Implementations must not panic or block; a logger has no way to report
/// failure back to the marshal.
pub trait CacheLogger: Send + Sync {
    /// Record a debug-level message.
    fn debug(&self, message: &str);
}

/// Logger that emits `tracing` debug events under the `fieldcache` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl CacheLogger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: LOG_TARGET, "{}", message);
    }
}

/// Install a JSON `tracing` subscriber filtered by `RUST_LOG`.
///
/// Falls back to `default_filter` when `RUST_LOG` is unset or invalid.
/// Returns false if a global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_logger_without_subscriber_is_silent() {
        TracingLogger.debug("Cache miss: (user:42)");
    }

    #[test]
    fn test_init_tracing_only_installs_once() {
        let first = init_tracing("fieldcache=debug");
        let second = init_tracing("fieldcache=debug");
        assert!(!second || !first);
    }
}
