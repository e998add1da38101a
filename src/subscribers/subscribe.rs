//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom event handlers (error sinks,
//! metrics, audit trails) into a provider. Each subscriber is driven by a dedicated
//! worker fed by a bounded queue owned by the provider's subscriber set.
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching, retries); they do **not** block
//!   fetches, the write-back loop, nor other subscribers.
//! - Each subscriber **declares** its preferred queue capacity via
//!   [`Subscribe::queue_capacity`]. If a queue overflows, events for that
//!   subscriber are **dropped** and a `SubscriberOverflow` event is published.
//!
//! ## Example
//! ```rust
//! use datavisor::{Event, Subscribe};
//! use async_trait::async_trait;
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.is_failure() {
//!             // bump a counter...
//!         }
//!     }
//!     fn name(&self) -> &'static str { "failure-counter" }
//!     fn queue_capacity(&self) -> usize { 256 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// Called from a subscriber-dedicated worker task. Implementations should avoid
/// blocking the async runtime (prefer async I/O and cooperative waits).
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    ///
    /// On overflow, events for this subscriber are **dropped**.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
