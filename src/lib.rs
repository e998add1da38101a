//! # datavisor
//!
//! **Datavisor** is an asynchronous single-value data provider for tokio.
//!
//! A [`DataProvider`] runs a read operation off the caller's path and publishes every
//! successful result into an [`ObservableSlot`] that the rest of the program watches.
//! Optionally it closes a write-back loop: the published value is scanned for
//! observable members, and whenever one of them changes a caller-supplied handler
//! builds an operation that writes the current value back.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   caller ── retrieve() ──► DataProvider ──► Job ──► Executor (RuntimeExecutor,
//!      ▲                          │                    TrackingExecutor, custom)
//!      │ FetchHandle<T>           │                         │
//!      └──────────────────────────┘                         ▼
//!                                                  run_once(Fetch<T>)
//!                                                          │ Ok(value)
//!                                                          ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  publish (serialized per provider)                               │
//! │  - release subscriptions of the previous value                   │
//! │  - ObservableSlot::set(value) → listeners + watch receivers      │
//! │  - scan(value) via Inspect → one listener per observable member  │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │ member invalidated
//!                                 ▼
//!                   WriteBack::create_fetch(slot value)
//!                                 │ fire-and-forget
//!                                 ▼
//!                   Executor (chain depth + 1, bounded)
//!
//! All of the above publish Events:
//!   Bus (broadcast) ──► event listener ──► SubscriberSet ──► LogWriter / custom
//!                  └──► DataProvider::events()
//! ```
//!
//! ### Fetch lifecycle
//! ```text
//! retrieve()
//!   ├─► Pending ──► Running ──┬─► Succeeded(value)   slot written first
//!   │                         ├─► Failed(error)      slot untouched, FetchFailed
//!   │                         └─► Cancelled          slot untouched, FetchCancelled
//!   └─► executor refuses      ──► Failed(Rejected)
//! ```
//!
//! ## Features
//! | Area              | Description                                                | Key types / traits                              |
//! |-------------------|------------------------------------------------------------|-------------------------------------------------|
//! | **Provider**      | Fetch off-path, publish into a slot, bind write-backs.     | [`DataProvider`], [`DataProviderBuilder`]       |
//! | **Observables**   | Single-value cell and value-less invalidation source.      | [`ObservableSlot`], [`Trigger`], [`Observable`] |
//! | **Fetches**       | Async/blocking read operations and their handles.          | [`Fetch`], [`FetchFn`], [`BlockingFn`], [`FetchHandle`] |
//! | **Executors**     | Pluggable scheduling, optionally tracked and capped.       | [`Executor`], [`RuntimeExecutor`], [`TrackingExecutor`] |
//! | **Scanning**      | Opt-in discovery of observable members.                    | [`Inspect`], [`Members`], [`scan`]              |
//! | **Subscriber API**| Error sinks and lifecycle hooks.                           | [`Subscribe`], [`LogWriter`]                    |
//! | **Errors**        | Typed errors for fetches, executors and scanning.          | [`FetchError`], [`ExecuteError`], [`AccessError`] |
//! | **Configuration** | Per-provider settings.                                     | [`ProviderConfig`]                              |
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use datavisor::{
//!     DataProvider, FetchError, FetchFn, FetchRef, Inspect, Members, ObservableSlot,
//!     ProviderConfig,
//! };
//!
//! #[derive(Clone)]
//! struct Account {
//!     owner: String,
//!     balance: ObservableSlot<i64>,
//! }
//!
//! impl Inspect for Account {
//!     fn inspect(&self, members: &mut Members) {
//!         members.observe("balance", &self.balance);
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let load = FetchFn::new("load-account", |_ctx: CancellationToken| async {
//!         Ok::<_, FetchError>(Account {
//!             owner: "ada".into(),
//!             balance: ObservableSlot::with_value(10),
//!         })
//!     });
//!
//!     let provider = DataProvider::builder(load)
//!         .with_config(ProviderConfig::named("accounts"))
//!         .with_write_back(|account: Account| -> FetchRef<()> {
//!             FetchFn::arc("save-account", move |_ctx: CancellationToken| {
//!                 let owner = account.owner.clone();
//!                 async move {
//!                     println!("saving {owner}");
//!                     Ok::<_, FetchError>(())
//!                 }
//!             })
//!         })
//!         .build()?;
//!
//!     provider.retrieve().result().await?;
//!
//!     // Changing a member writes the account back.
//!     if let Some(account) = provider.slot().get() {
//!         account.balance.set(25);
//!     }
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod executor;
mod fetch;
mod observable;
mod scan;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{DataProvider, DataProviderBuilder, Phase, ProviderConfig, WriteBack};
pub use error::{AccessError, ExecuteError, FetchError, ProviderError};
pub use events::{Event, EventKind};
pub use executor::{
    Executor, ExecutorRef, Job, JobInfo, Rejected, RuntimeExecutor, TrackingExecutor,
};
pub use fetch::{
    BlockingFn, BoxFetchFuture, Fetch, FetchFn, FetchHandle, FetchRef, FetchState, FetchStatus,
};
pub use observable::{
    InvalidationListener, Observable, ObservableRef, ObservableSlot, Subscription, Trigger,
};
pub use scan::{DependencyEntry, Inspect, Members, Scan, scan};
pub use subscribers::{LogWriter, Subscribe};
