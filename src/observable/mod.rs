//! Observable values.
//!
//! ## Contents
//! - [`Observable`] the capability the write-back loop subscribes to
//! - [`ObservableSlot`] single-value cell published by a provider
//! - [`Trigger`] value-less invalidation source
//! - [`Subscription`] RAII guard for one attached listener

mod listeners;
mod slot;
mod trigger;

pub use listeners::{InvalidationListener, Observable, ObservableRef, Subscription};
pub use slot::ObservableSlot;
pub use trigger::Trigger;
