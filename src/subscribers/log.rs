//! # Default error sink: events to `tracing`.
//!
//! [`LogWriter`] is installed on every provider unless the builder is given an explicit
//! subscriber list. Failures are logged at `error`, skipped/suppressed work at `warn`,
//! lifecycle at `debug`/`trace`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! ERROR datavisor: fetch failed provider="users" fetch=1 reason="fetch failed: connection refused"
//!  WARN datavisor: member skipped provider="users" fetch=2 member="audit" reason="locked"
//!  WARN datavisor: write-back suppressed provider="users" member="counter" depth=9
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that forwards events to `tracing` under the `datavisor` target.
#[derive(Default, Debug, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let provider = e.provider.as_deref().unwrap_or("-");
        let member = e.member.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::FetchFailed => {
                tracing::error!(target: "datavisor", provider, fetch = ?e.fetch, reason, "fetch failed");
            }
            EventKind::WriteBackFailed => {
                tracing::error!(target: "datavisor", provider, fetch = ?e.fetch, member, reason, "write-back failed");
            }
            EventKind::TimeoutHit => {
                tracing::warn!(target: "datavisor", provider, fetch = ?e.fetch, timeout_ms = ?e.timeout_ms, "fetch timed out");
            }
            EventKind::MemberSkipped => {
                tracing::warn!(target: "datavisor", provider, fetch = ?e.fetch, member, reason, "member skipped");
            }
            EventKind::WriteBackSuppressed => {
                tracing::warn!(target: "datavisor", provider, member, depth = ?e.depth, "write-back suppressed");
            }
            EventKind::WriteBackSkipped => {
                tracing::warn!(target: "datavisor", provider, member, "write-back skipped: slot empty");
            }
            EventKind::SlotReplaceRejected => {
                tracing::warn!(target: "datavisor", provider, "slot replacement after first retrieve ignored");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "datavisor", subscriber = member, reason, "subscriber dropped event");
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(target: "datavisor", subscriber = member, reason, "subscriber panicked");
            }
            EventKind::FetchCancelled => {
                tracing::debug!(target: "datavisor", provider, fetch = ?e.fetch, reason, "fetch cancelled");
            }
            EventKind::FetchSucceeded => {
                tracing::debug!(target: "datavisor", provider, fetch = ?e.fetch, "slot updated");
            }
            EventKind::DependenciesBound => {
                tracing::debug!(target: "datavisor", provider, fetch = ?e.fetch, count = ?e.count, "dependencies bound");
            }
            EventKind::SubscriptionsReleased => {
                tracing::debug!(target: "datavisor", provider, count = ?e.count, "subscriptions released");
            }
            EventKind::WriteBackFired => {
                tracing::debug!(target: "datavisor", provider, fetch = ?e.fetch, member, depth = ?e.depth, "write-back fired");
            }
            EventKind::WriteBackCompleted => {
                tracing::trace!(target: "datavisor", provider, fetch = ?e.fetch, "write-back completed");
            }
            EventKind::FetchStarting => {
                tracing::trace!(target: "datavisor", provider, fetch = ?e.fetch, "fetch starting");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
