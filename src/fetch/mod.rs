//! # Fetch abstractions.
//!
//! This module provides the read-operation types:
//! - [`Fetch`] trait for async cancelable operations producing one value
//! - [`FetchFn`], [`BlockingFn`] closure-backed implementations
//! - [`FetchRef`] shared reference to a fetch (`Arc<dyn Fetch<T>>`)
//! - [`FetchHandle`], [`FetchState`], [`FetchStatus`] observing one execution

mod fetch;
mod fetch_fn;
mod handle;

pub use fetch::{BoxFetchFuture, Fetch, FetchRef};
pub use fetch_fn::{BlockingFn, FetchFn};
pub(crate) use handle::Completion;
pub use handle::{FetchHandle, FetchState, FetchStatus};
