//! Deferred values: computations producing zero or one result.
//!
//! Interceptors and item sources may answer immediately, later (a future),
//! or through a stream of values. [`Deferred<T>`] puts all three behind one
//! awaitable type whose output is `Option<T>`: `Some` carries the result and
//! `None` means the computation was cancelled or produced nothing.
//!
//! # Example
//!
//! ```
//! use horizon_itemlist_core::Deferred;
//!
//! # futures_util::FutureExt::now_or_never(async {
//! assert_eq!(Deferred::ready(7).await, Some(7));
//! assert_eq!(Deferred::<i32>::cancelled().await, None);
//!
//! let stream = futures_util::stream::iter(vec![1, 2, 3]);
//! assert_eq!(Deferred::from_stream(stream).await, Some(1));
//! # }).unwrap();
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{Stream, StreamExt};

/// A single-resolution deferred computation.
///
/// Awaiting a `Deferred<T>` yields `Some(value)` or `None` when cancelled.
#[must_use = "deferred values do nothing unless awaited"]
pub struct Deferred<T> {
    inner: BoxFuture<'static, Option<T>>,
}

impl<T: Send + 'static> Deferred<T> {
    /// A deferred value that is already resolved.
    pub fn ready(value: T) -> Self {
        Self::from_option(Some(value))
    }

    /// A deferred value that resolves to nothing.
    pub fn cancelled() -> Self {
        Self::from_option(None)
    }

    /// A deferred value resolved from an optional result.
    pub fn from_option(value: Option<T>) -> Self {
        Self {
            inner: futures_util::future::ready(value).boxed(),
        }
    }

    /// Wrap a future that produces an optional result.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Option<T>> + Send + 'static,
    {
        Self {
            inner: future.boxed(),
        }
    }

    /// Wrap a future that always produces a result.
    pub fn from_value_future<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            inner: future.map(Some).boxed(),
        }
    }

    /// Take the first emission of a stream. An empty stream cancels.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        Self {
            inner: async move {
                let mut stream = Box::pin(stream);
                stream.next().await
            }
            .boxed(),
        }
    }

    /// Transform the resolved value. Cancellation passes through.
    pub fn map<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        Deferred {
            inner: self.inner.map(move |value| value.map(f)).boxed(),
        }
    }
}

impl<T> Future for Deferred<T> {
    type Output = Option<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

#[cfg(feature = "tokio")]
mod channel {
    use tokio::sync::oneshot;

    use super::Deferred;
    use crate::error::{CoreError, Result};

    /// The producing half of [`Deferred::channel`].
    ///
    /// Dropping the resolver without resolving cancels the deferred value.
    #[derive(Debug)]
    pub struct Resolver<T> {
        sender: oneshot::Sender<T>,
    }

    impl<T> Resolver<T> {
        /// Resolve the paired deferred value.
        pub fn resolve(self, value: T) -> Result<()> {
            self.sender
                .send(value)
                .map_err(|_| CoreError::DeferredDropped)
        }

        /// Cancel the paired deferred value.
        pub fn cancel(self) {}
    }

    impl<T: Send + 'static> Deferred<T> {
        /// Create a deferred value resolved later through a [`Resolver`].
        pub fn channel() -> (Resolver<T>, Deferred<T>) {
            let (sender, receiver) = oneshot::channel();
            let deferred = Deferred::from_future(async move { receiver.await.ok() });
            (Resolver { sender }, deferred)
        }
    }
}

#[cfg(feature = "tokio")]
pub use channel::Resolver;

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[tokio::test]
    async fn test_ready_and_cancelled() {
        assert_eq!(Deferred::ready("a").await, Some("a"));
        assert_eq!(Deferred::<u8>::cancelled().await, None);
    }

    #[tokio::test]
    async fn test_from_future() {
        let deferred = Deferred::from_value_future(async { 40 + 2 });
        assert_eq!(deferred.await, Some(42));

        let vetoed = Deferred::<u8>::from_future(async { None });
        assert_eq!(vetoed.await, None);
    }

    #[tokio::test]
    async fn test_from_stream_takes_first() {
        assert_eq!(Deferred::from_stream(stream::iter(vec![3, 4])).await, Some(3));
        assert_eq!(Deferred::from_stream(stream::empty::<u8>()).await, None);
    }

    #[tokio::test]
    async fn test_map() {
        let doubled = Deferred::ready(21).map(|v| v * 2);
        assert_eq!(doubled.await, Some(42));

        let cancelled = Deferred::<i32>::cancelled().map(|v| v * 2);
        assert_eq!(cancelled.await, None);
    }

    #[cfg(feature = "tokio")]
    #[tokio::test]
    async fn test_channel() {
        let (resolver, deferred) = Deferred::channel();
        tokio::spawn(async move {
            resolver.resolve(5).unwrap();
        });
        assert_eq!(deferred.await, Some(5));

        let (resolver, deferred) = Deferred::<u8>::channel();
        resolver.cancel();
        assert_eq!(deferred.await, None);
    }
}
