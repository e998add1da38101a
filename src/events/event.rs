//! # Runtime events emitted by data providers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Fetch events**: one fetch's lifecycle (starting, succeeded, failed, cancelled, timeout)
//! - **Binding events**: dependency scanning and subscription bookkeeping
//! - **Write-back events**: invalidation-driven write-back fetches
//! - **Subscriber events**: problems inside the fan-out itself
//!
//! The [`Event`] struct carries additional metadata such as timestamps, provider name,
//! fetch id, member name, reason, chain depth and counts.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use datavisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::FetchFailed)
//!     .with_provider("users")
//!     .with_fetch(3)
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::FetchFailed);
//! assert_eq!(ev.provider.as_deref(), Some("users"));
//! assert_eq!(ev.fetch, Some(3));
//! assert!(ev.is_failure());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Fetch lifecycle ===
    /// A fetch started running.
    ///
    /// Sets: `provider`, `fetch`
    FetchStarting,

    /// A fetch produced a value and the slot was updated.
    ///
    /// Sets: `provider`, `fetch`
    FetchSucceeded,

    /// A fetch failed; the slot was left untouched.
    ///
    /// Sets: `provider`, `fetch`, `reason`
    FetchFailed,

    /// A fetch was cancelled or abandoned; the slot was left untouched.
    ///
    /// Sets: `provider`, `fetch`, `reason` (optional)
    FetchCancelled,

    /// A fetch exceeded its timeout (always followed by `FetchFailed` or `WriteBackFailed`).
    ///
    /// Sets: `provider`, `fetch`, `timeout_ms`
    TimeoutHit,

    /// `set_slot` was called after the first `retrieve` and ignored.
    ///
    /// Sets: `provider`
    SlotReplaceRejected,

    // === Dependency binding ===
    /// Write-back listeners were attached to the dependencies of a new value.
    ///
    /// Sets: `provider`, `fetch`, `count` (number of subscriptions)
    DependenciesBound,

    /// The scanner skipped a member it could not access.
    ///
    /// Sets: `provider`, `fetch`, `member`, `reason`
    MemberSkipped,

    /// Subscriptions belonging to a superseded value were released.
    ///
    /// Sets: `provider`, `count`
    SubscriptionsReleased,

    // === Write-back ===
    /// A dependency was invalidated and a write-back fetch was dispatched.
    ///
    /// Sets: `provider`, `fetch`, `member`, `depth`
    WriteBackFired,

    /// A write-back fetch finished successfully (result discarded).
    ///
    /// Sets: `provider`, `fetch`
    WriteBackCompleted,

    /// A write-back fetch failed, panicked, timed out or was rejected.
    ///
    /// Sets: `provider`, `fetch` (optional), `member` (optional), `reason`
    WriteBackFailed,

    /// An invalidation arrived while the slot was empty; nothing was fired.
    ///
    /// Sets: `provider`, `member`
    WriteBackSkipped,

    /// A write-back chain reached the configured depth limit; nothing was fired.
    ///
    /// Sets: `provider`, `member`, `depth`
    WriteBackSuppressed,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `reason` (panic info), `member` (subscriber name)
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason`, `member` (subscriber name)
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the provider that emitted the event.
    pub provider: Option<Arc<str>>,
    /// Fetch id (per provider, starting from 1).
    pub fetch: Option<u64>,
    /// Member or subscriber name, if applicable.
    pub member: Option<Arc<str>>,
    /// Human-readable reason (errors, skip details, etc.).
    pub reason: Option<Arc<str>>,
    /// Write-back chain depth (1 = fired outside any write-back).
    pub depth: Option<u32>,
    /// Count attached to binding events.
    pub count: Option<u32>,
    /// Fetch timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            provider: None,
            fetch: None,
            member: None,
            reason: None,
            depth: None,
            count: None,
            timeout_ms: None,
        }
    }

    /// Attaches the emitting provider's name.
    #[inline]
    pub fn with_provider(mut self, provider: impl Into<Arc<str>>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Attaches a fetch id.
    #[inline]
    pub fn with_fetch(mut self, id: u64) -> Self {
        self.fetch = Some(id);
        self
    }

    /// Attaches a member (or subscriber) name.
    #[inline]
    pub fn with_member(mut self, member: impl Into<Arc<str>>) -> Self {
        self.member = Some(member.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a write-back chain depth.
    #[inline]
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Attaches a count, saturating at `u32::MAX`.
    #[inline]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(u32::try_from(count).unwrap_or(u32::MAX));
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_member(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_member(subscriber)
            .with_reason(info)
    }

    /// True for events that report a failed fetch or write-back.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self.kind, EventKind::FetchFailed | EventKind::WriteBackFailed)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::FetchStarting);
        let b = Event::new(EventKind::FetchSucceeded);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_count_saturates() {
        let ev = Event::new(EventKind::DependenciesBound).with_count(usize::MAX);
        assert_eq!(ev.count, Some(u32::MAX));
    }

    #[test]
    fn test_timeout_stored_in_millis() {
        let ev = Event::new(EventKind::TimeoutHit).with_timeout(Duration::from_millis(1500));
        assert_eq!(ev.timeout_ms, Some(1500));
    }

    #[test]
    fn test_subscriber_helpers() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.member.as_deref(), Some("audit"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber=audit reason=full"));
        assert!(Event::subscriber_panicked("audit", "boom".into()).is_subscriber_panic());
    }
}
