//! Error types used by data providers, executors and the dependency scanner.
//!
//! This module defines the error enums of the crate:
//!
//! - [`FetchError`] errors raised by a single fetch (read or write-back).
//! - [`ExecuteError`] an executor refusing a job.
//! - [`AccessError`] one member skipped by the dependency scanner.
//! - [`ProviderError`] failures while building a provider.
//!
//! All of them provide `as_label` for logs/metrics. Only [`ProviderError`] is ever
//! returned from a public call; the others travel on [`FetchHandle`](crate::FetchHandle)s
//! and [`Event`](crate::Event)s.

use std::borrow::Cow;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by fetch execution.
///
/// Reported through the fetch handle and published as events; never returned
/// from [`DataProvider::retrieve`](crate::DataProvider::retrieve).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FetchError {
    /// The read operation returned an error.
    #[error("fetch failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Fetch exceeded its configured timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Fetch was cancelled before it produced a value.
    #[error("fetch cancelled")]
    Canceled,

    /// The read operation panicked.
    #[error("fetch panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// The executor refused the job.
    #[error("rejected by executor: {0}")]
    Rejected(#[from] ExecuteError),
}

impl FetchError {
    /// Builds a [`FetchError::Fail`] from anything printable.
    ///
    /// # Example
    /// ```
    /// use datavisor::FetchError;
    ///
    /// let err = FetchError::fail("connection refused");
    /// assert_eq!(err.to_string(), "fetch failed: connection refused");
    /// ```
    pub fn fail(error: impl ToString) -> Self {
        FetchError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use datavisor::FetchError;
    /// use std::time::Duration;
    ///
    /// let err = FetchError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "fetch_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            FetchError::Fail { .. } => "fetch_failed",
            FetchError::Timeout { .. } => "fetch_timeout",
            FetchError::Canceled => "fetch_canceled",
            FetchError::Panicked { .. } => "fetch_panicked",
            FetchError::Rejected(_) => "fetch_rejected",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            FetchError::Fail { error } => format!("error: {error}"),
            FetchError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            FetchError::Canceled => "cancelled".to_string(),
            FetchError::Panicked { info } => format!("panic: {info}"),
            FetchError::Rejected(e) => format!("rejected: {e}"),
        }
    }

    /// True for outcomes that leave the slot untouched without being a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, FetchError::Canceled)
    }
}

/// # Errors produced by an [`Executor`](crate::Executor) refusing work.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecuteError {
    /// The executor no longer accepts work (runtime gone or executor closed).
    #[error("executor closed")]
    Closed,

    /// The executor refused this particular job.
    #[error("{reason}")]
    Rejected {
        /// Why the job was refused.
        reason: String,
    },
}

impl ExecuteError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ExecuteError::Closed => "executor_closed",
            ExecuteError::Rejected { .. } => "executor_rejected",
        }
    }
}

/// # A member skipped by the dependency scanner.
///
/// Produced when an accessor passed to
/// [`Members::observe_with`](crate::Members::observe_with) fails or panics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("member `{member}` skipped: {reason}")]
pub struct AccessError {
    /// Name of the member as given to the scanner.
    pub member: Cow<'static, str>,
    /// Why the member could not be read.
    pub reason: String,
}

/// # Errors produced while building a provider.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProviderError {
    /// `build()` ran outside a tokio runtime and no runtime handle was supplied.
    #[error("no tokio runtime available; call build() inside a runtime or pass with_runtime()")]
    NoRuntime,
}

impl ProviderError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ProviderError::NoRuntime => "provider_no_runtime",
        }
    }
}

/// Renders a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
