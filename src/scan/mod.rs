//! Structural dependency discovery.
//!
//! ## Contents
//! - [`Inspect`] capability trait implemented by result types
//! - [`Members`] collector the trait reports into
//! - [`scan`] runs one inspection and returns a [`Scan`] of [`DependencyEntry`]s

mod dependency;
mod inspect;

pub use dependency::{DependencyEntry, Scan, scan};
pub use inspect::{Inspect, Members};
