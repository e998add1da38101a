//! # Fetch abstraction.
//!
//! This module defines the [`Fetch`] trait (async, cancelable, produces one value) and
//! the shared handle type [`FetchRef`], an `Arc<dyn Fetch<T>>` suitable for sharing
//! across jobs.
//!
//! A fetch receives a [`CancellationToken`] and should check it to stop cooperatively.
//! The provider races every fetch against its token anyway, so a fetch that ignores
//! the token is abandoned (not interrupted) on cancellation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::FetchError;

/// Boxed future returned by [`Fetch::fetch`].
pub type BoxFetchFuture<T> = Pin<Box<dyn Future<Output = Result<T, FetchError>> + Send + 'static>>;

/// Shared handle to a fetch.
pub type FetchRef<T> = Arc<dyn Fetch<T>>;

/// # Asynchronous, cancelable read operation.
///
/// Each call to [`fetch`](Fetch::fetch) creates a **new** future; the provider calls it
/// once per [`retrieve`](crate::DataProvider::retrieve).
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use datavisor::{BoxFetchFuture, Fetch, FetchError};
///
/// struct Greeting;
///
/// impl Fetch<String> for Greeting {
///     fn name(&self) -> &str { "greeting" }
///
///     fn fetch(&self, ctx: CancellationToken) -> BoxFetchFuture<String> {
///         Box::pin(async move {
///             if ctx.is_cancelled() {
///                 return Err(FetchError::Canceled);
///             }
///             Ok("hello".to_string())
///         })
///     }
/// }
/// ```
pub trait Fetch<T>: Send + Sync + 'static {
    /// Returns a stable, human-readable name.
    fn name(&self) -> &str;

    /// Creates a new future that produces one value.
    fn fetch(&self, ctx: CancellationToken) -> BoxFetchFuture<T>;
}

impl<T, F> Fetch<T> for Arc<F>
where
    F: Fetch<T> + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&self, ctx: CancellationToken) -> BoxFetchFuture<T> {
        (**self).fetch(ctx)
    }
}
