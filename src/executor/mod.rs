//! Executors: where fetch jobs run.
//!
//! ## Contents
//! - [`Executor`] contract and the [`Job`] it receives
//! - [`RuntimeExecutor`] default: spawn on a tokio runtime
//! - [`TrackingExecutor`] spawn + live registry of in-flight jobs + optional concurrency cap

mod executor;
mod runtime;
mod tracking;

pub use executor::{Executor, ExecutorRef, Job, Rejected};
pub use runtime::RuntimeExecutor;
pub use tracking::{JobInfo, TrackingExecutor};
