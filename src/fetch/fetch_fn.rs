//! # Closure-backed fetches.
//!
//! - [`FetchFn`] wraps `F: Fn(CancellationToken) -> Fut`, producing a fresh future per call.
//! - [`BlockingFn`] wraps `F: Fn() -> Result<T, FetchError>` and runs it on the runtime's
//!   blocking pool, for readers that do synchronous I/O.
//!
//! Neither holds hidden mutable state between calls; if shared state is needed,
//! capture an `Arc<...>` explicitly.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use datavisor::{BlockingFn, FetchError, FetchFn, FetchRef};
//!
//! let remote: FetchRef<u32> = FetchFn::arc("remote", |_ctx: CancellationToken| async move {
//!     Ok::<_, FetchError>(42)
//! });
//! assert_eq!(remote.name(), "remote");
//!
//! let disk: FetchRef<String> = BlockingFn::arc("disk", || {
//!     std::fs::read_to_string("/etc/hostname").map_err(FetchError::fail)
//! });
//! assert_eq!(disk.name(), "disk");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{FetchError, panic_message};
use crate::fetch::fetch::{BoxFetchFuture, Fetch};

/// Async-closure-backed fetch.
#[derive(Debug)]
pub struct FetchFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> FetchFn<F> {
    /// Creates a new closure-backed fetch.
    ///
    /// Prefer [`FetchFn::arc`] when you immediately need a [`FetchRef`](crate::FetchRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    /// Creates the fetch and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<T, F, Fut> Fetch<T> for FetchFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, ctx: CancellationToken) -> BoxFetchFuture<T> {
        Box::pin((self.f)(ctx))
    }
}

/// Blocking-closure-backed fetch, executed with `tokio::task::spawn_blocking`.
///
/// The closure cannot observe cancellation; a cancelled fetch is abandoned and its
/// result dropped when it eventually returns.
pub struct BlockingFn<T, F> {
    name: Cow<'static, str>,
    f: Arc<F>,
    _out: PhantomData<fn() -> T>,
}

impl<T, F> BlockingFn<T, F>
where
    F: Fn() -> Result<T, FetchError> + Send + Sync + 'static,
    T: Send + 'static,
{
    /// Creates a new blocking fetch.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f: Arc::new(f),
            _out: PhantomData,
        }
    }

    /// Creates the fetch and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<T, F> Fetch<T> for BlockingFn<T, F>
where
    F: Fn() -> Result<T, FetchError> + Send + Sync + 'static,
    T: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, _ctx: CancellationToken) -> BoxFetchFuture<T> {
        let f = Arc::clone(&self.f);
        Box::pin(async move {
            match tokio::task::spawn_blocking(move || f()).await {
                Ok(res) => res,
                Err(join) if join.is_panic() => Err(FetchError::Panicked {
                    info: panic_message(join.into_panic().as_ref()),
                }),
                Err(_) => Err(FetchError::Canceled),
            }
        })
    }
}

impl<T, F> std::fmt::Debug for BlockingFn<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingFn").field("name", &self.name).finish()
    }
}
