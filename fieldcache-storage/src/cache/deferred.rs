//! Deferred values produced by resolve operations.
//!
//! A resolve operation either has its value on hand ([`Resolution::Ready`])
//! or hands back a computation that completes later
//! ([`Resolution::Deferred`]). The set of kinds is closed: the marshal
//! matches on the enum instead of inspecting the runtime type of a value.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use fieldcache_core::{CacheError, CacheResult};
use futures_util::future::{self, BoxFuture};
use futures_util::FutureExt;

/// Handle to a value that is not available yet.
///
/// Nothing runs until the handle is awaited. [`Deferred::then`] registers a
/// continuation and returns a new handle, so a deferred value can be extended
/// without blocking on it.
pub struct Deferred<T> {
    inner: BoxFuture<'static, CacheResult<T>>,
}

impl<T: Send + 'static> Deferred<T> {
    /// Wrap a future.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = CacheResult<T>> + Send + 'static,
    {
        Self {
            inner: future.boxed(),
        }
    }

    /// A deferred handle whose value is already known.
    pub fn ready(value: T) -> Self {
        Self::new(future::ready(Ok(value)))
    }

    /// A deferred handle that fails when awaited.
    pub fn failed(error: CacheError) -> Self {
        Self::new(future::ready(Err(error)))
    }

    /// Chain a continuation that receives the inner value once it exists.
    ///
    /// Errors from this handle skip the continuation and surface unchanged.
    pub fn then<U, F, Fut>(self, continuation: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = CacheResult<U>> + Send + 'static,
    {
        Deferred::new(async move {
            let value = self.inner.await?;
            continuation(value).await
        })
    }

    /// Transform the inner value once it exists.
    pub fn map<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        Deferred::new(self.inner.map(|result| result.map(f)))
    }
}

impl<T> Future for Deferred<T> {
    type Output = CacheResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

/// Outcome of invoking a resolve operation.
#[derive(Debug)]
pub enum Resolution<T> {
    /// The value is available now.
    Ready(T),
    /// The value arrives when the handle completes.
    Deferred(Deferred<T>),
}

impl<T: Send + 'static> Resolution<T> {
    /// A value that is available now.
    pub fn ready(value: T) -> Self {
        Self::Ready(value)
    }

    /// A value produced by a future.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = CacheResult<T>> + Send + 'static,
    {
        Self::Deferred(Deferred::new(future))
    }

    /// Returns true if the value is not available yet.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    /// Returns true if the value is available now.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The value, if it is available without waiting.
    pub fn as_ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Deferred(_) => None,
        }
    }

    /// View either kind as a deferred handle.
    pub fn into_deferred(self) -> Deferred<T> {
        match self {
            Self::Ready(value) => Deferred::ready(value),
            Self::Deferred(deferred) => deferred,
        }
    }

    /// Wait for the value.
    pub async fn resolve(self) -> CacheResult<T> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::Deferred(deferred) => deferred.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_deferred_is_lazy_until_awaited() {
        let started = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&started);
        let deferred = Deferred::new(async move {
            flag.store(true, Ordering::SeqCst);
            Ok(7)
        });

        assert!(!started.load(Ordering::SeqCst));
        assert_eq!(deferred.await.unwrap(), 7);
        assert!(started.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_then_receives_inner_value() {
        let chained = Deferred::ready(20).then(|v| async move { Ok(v + 1) });
        assert_eq!(chained.await.unwrap(), 21);
    }

    #[tokio::test]
    async fn test_then_skips_continuation_on_error() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let chained = Deferred::<i32>::failed(CacheError::resolve_failed("nope")).then(
            move |v| async move {
                flag.store(true, Ordering::SeqCst);
                Ok(v)
            },
        );

        assert_eq!(
            chained.await.unwrap_err(),
            CacheError::resolve_failed("nope")
        );
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_map() {
        let mapped = Deferred::ready("ada").map(|s| s.to_uppercase());
        assert_eq!(mapped.await.unwrap(), "ADA");
    }

    #[tokio::test]
    async fn test_resolution_kinds() {
        let ready = Resolution::ready(1);
        assert!(ready.is_ready());
        assert_eq!(ready.as_ready(), Some(&1));
        assert_eq!(ready.resolve().await.unwrap(), 1);

        let deferred = Resolution::deferred(async { Ok(2) });
        assert!(deferred.is_deferred());
        assert_eq!(deferred.as_ready(), None);
        assert_eq!(deferred.resolve().await.unwrap(), 2);

        assert_eq!(Resolution::ready(3).into_deferred().await.unwrap(), 3);
    }
}
