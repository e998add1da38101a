//! # Event subscribers (error sinks).
//!
//! This module provides the [`Subscribe`] trait and its built-in implementation for
//! handling events broadcast by a provider.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   fetch job / write-back ── publish(Event) ──► Bus ──► event listener
//!                                                            │
//!                                                   SubscriberSet::emit
//!                                                 ┌──────────┼──────────┐
//!                                                 ▼          ▼          ▼
//!                                             LogWriter   Metrics    Custom
//! ```
//!
//! A provider built without [`with_subscribers`](crate::DataProviderBuilder::with_subscribers)
//! gets a single [`LogWriter`].

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub(crate) use set::SubscriberSet;
pub use subscribe::Subscribe;
