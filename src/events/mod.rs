//! Provider events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by providers, write-back listeners and
//! subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: fetch jobs, the write-back loop, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the provider's event listener (fans out to `SubscriberSet`) and any
//!   receiver obtained from [`DataProvider::events`](crate::DataProvider::events).

mod bus;
mod event;

pub(crate) use bus::Bus;
pub use event::{Event, EventKind};
