//! Provider core: fetching, publishing and the write-back loop.
//!
//! The public API of this module is [`DataProvider`], its [`DataProviderBuilder`],
//! [`ProviderConfig`] and the [`WriteBack`] handler trait.
//!
//! Internal modules:
//! - [`runner`]: runs one fetch with cancellation, timeout and panic capture;
//! - [`provider`]: job creation, completion wiring, slot publishing, subscription registry;
//! - [`writeback`]: invalidation listeners, chain-depth guard, write-back dispatch;
//! - [`builder`]: assembles a provider and its event pipeline.

mod builder;
mod config;
mod emitter;
mod provider;
mod runner;
mod writeback;

pub use builder::DataProviderBuilder;
pub use config::ProviderConfig;
pub use provider::{DataProvider, Phase};
pub use writeback::WriteBack;
