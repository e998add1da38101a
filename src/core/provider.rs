//! # Single-value data provider.
//!
//! [`DataProvider`] runs a read operation on an executor and publishes each successful
//! result into an [`ObservableSlot`]. With a write-back handler installed it also binds
//! to the observable members of the published value (see [`writeback`](super::writeback)).
//!
//! ## Architecture
//! ```text
//! retrieve() ──► Job ──► Executor ──► run_once(read)
//!                                       ├─ Ok(v)   → publish(v) → handle: Succeeded(v)
//!                                       │             ├─ release old subscriptions
//!                                       │             ├─ slot.set(v)
//!                                       │             └─ scan(v) → bind listeners
//!                                       ├─ Err(e)  → FetchFailed → handle: Failed(e)
//!                                       └─ cancel  → FetchCancelled → handle: Cancelled
//! ```
//!
//! ## Rules
//! - No overlap guard: every `retrieve` runs independently and the last completion
//!   wins the slot.
//! - A failed or cancelled fetch never touches the slot.
//! - The slot write and the rebinding of subscriptions are serialized per provider,
//!   so the registry always belongs to the value that ended up in the slot.
//! - Dropping the provider cancels every fetch and write-back still in flight.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use futures::FutureExt;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::builder::DataProviderBuilder;
use super::config::ProviderConfig;
use super::emitter::Emitter;
use super::runner::run_once;
use super::writeback::{WriteBack, WriteBackConfig, current_depth, in_chain};
use crate::error::{ExecuteError, FetchError};
use crate::events::{Event, EventKind};
use crate::executor::{ExecutorRef, Job};
use crate::fetch::{Completion, Fetch, FetchHandle, FetchRef, FetchState};
use crate::observable::{ObservableSlot, Subscription};
use crate::scan::{Inspect, Scan};

/// Coarse lifecycle of a provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Nothing published and nothing running.
    Idle,
    /// At least one fetch is in flight.
    Fetching,
    /// A value was published; no dependencies are being watched.
    Published,
    /// A value was published and write-back listeners are attached to it.
    Watching,
}

/// Subscriptions that belong to the currently published value.
#[derive(Default)]
struct Binding {
    subscriptions: Vec<Subscription>,
    published: bool,
}

pub(crate) struct Inner<T> {
    pub(super) cfg: ProviderConfig,
    pub(super) emit: Emitter,
    pub(super) executor: ExecutorRef,
    pub(super) shutdown: CancellationToken,
    reader: FetchRef<T>,
    slot: RwLock<ObservableSlot<T>>,
    write_back: RwLock<Option<WriteBackConfig<T>>>,
    publish_lock: Mutex<()>,
    binding: Mutex<Binding>,
    next_id: AtomicU64,
    pub(super) generation: AtomicU64,
    inflight: AtomicUsize,
    started: AtomicBool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(super) fn new(
        cfg: ProviderConfig,
        emit: Emitter,
        executor: ExecutorRef,
        reader: FetchRef<T>,
        slot: ObservableSlot<T>,
        write_back: Option<WriteBackConfig<T>>,
    ) -> Self {
        Self {
            cfg,
            emit,
            executor,
            shutdown: CancellationToken::new(),
            reader,
            slot: RwLock::new(slot),
            write_back: RwLock::new(write_back),
            publish_lock: Mutex::new(()),
            binding: Mutex::new(Binding::default()),
            next_id: AtomicU64::new(0),
            generation: AtomicU64::new(0),
            inflight: AtomicUsize::new(0),
            started: AtomicBool::new(false),
        }
    }

    pub(super) fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(super) fn slot(&self) -> ObservableSlot<T> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(super) fn write_back(&self) -> Option<WriteBackConfig<T>> {
        self.write_back
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_write_back(&self, cfg: Option<WriteBackConfig<T>>) {
        *self
            .write_back
            .write()
            .unwrap_or_else(PoisonError::into_inner) = cfg;
    }

    /// Drops every subscription of the current value and retires its listeners.
    fn release(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let released = std::mem::take(&mut lock(&self.binding).subscriptions);
        if !released.is_empty() {
            let count = released.len();
            drop(released);
            self.emit.publish(
                self.emit
                    .event(EventKind::SubscriptionsReleased)
                    .with_count(count),
            );
        }
    }

    async fn run_fetch(self: &Arc<Self>, job: &mut InFlight<T>, token: &CancellationToken) {
        let id = job.id;
        job.done.running();
        self.emit
            .publish(self.emit.event(EventKind::FetchStarting).with_fetch(id));

        let res = run_once(
            self.reader.as_ref(),
            token,
            self.cfg.fetch_timeout(),
            &self.emit,
            id,
        )
        .await;

        match res {
            Ok(value) => {
                self.publish(id, &value);
                job.settle();
                self.emit
                    .publish(self.emit.event(EventKind::FetchSucceeded).with_fetch(id));
                job.done.finish(FetchState::Succeeded(value));
            }
            Err(e) if e.is_cancellation() => {
                job.settle();
                self.cancelled(id, &job.done, None);
            }
            Err(e) => {
                job.settle();
                self.failed(id, &job.done, e);
            }
        }
    }

    fn failed(&self, id: u64, done: &Completion<T>, err: FetchError) {
        self.emit.publish(
            self.emit
                .event(EventKind::FetchFailed)
                .with_fetch(id)
                .with_reason(err.to_string()),
        );
        done.finish(FetchState::Failed(Arc::new(err)));
    }

    fn cancelled(&self, id: u64, done: &Completion<T>, reason: Option<&'static str>) {
        if done.finish(FetchState::Cancelled) {
            let mut ev = self.emit.event(EventKind::FetchCancelled).with_fetch(id);
            if let Some(reason) = reason {
                ev = ev.with_reason(reason);
            }
            self.emit.publish(ev);
        }
    }

    /// Writes `value` into the slot and rebinds the write-back listeners.
    fn publish(self: &Arc<Self>, id: u64, value: &T) {
        let _serial = lock(&self.publish_lock);

        self.release();
        lock(&self.binding).published = true;

        self.slot().set(value.clone());

        if let Some(wb) = self.write_back() {
            self.bind(id, (wb.scan)(value));
        }
    }

    fn bind(self: &Arc<Self>, id: u64, found: Scan) {
        let (entries, skipped) = found.into_parts();
        for miss in skipped {
            self.emit.publish(
                self.emit
                    .event(EventKind::MemberSkipped)
                    .with_fetch(id)
                    .with_member(miss.member.as_ref())
                    .with_reason(miss.reason),
            );
        }

        let generation = self.generation.load(Ordering::Acquire);
        let subscriptions: Vec<Subscription> = entries
            .iter()
            .map(|e| {
                e.observable
                    .add_listener(self.listener_for(&e.member, generation))
            })
            .collect();
        let count = subscriptions.len();
        lock(&self.binding).subscriptions = subscriptions;

        self.emit.publish(
            self.emit
                .event(EventKind::DependenciesBound)
                .with_fetch(id)
                .with_count(count),
        );
    }

    fn phase(&self) -> Phase {
        if self.inflight.load(Ordering::Acquire) > 0 {
            return Phase::Fetching;
        }
        let binding = lock(&self.binding);
        if !binding.subscriptions.is_empty() {
            Phase::Watching
        } else if binding.published {
            Phase::Published
        } else {
            Phase::Idle
        }
    }
}

/// One fetch counted as in flight until it settles.
///
/// A job dropped before it settled (executor shut down, runtime gone) reports
/// `Cancelled`.
struct InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<Inner<T>>,
    done: Completion<T>,
    id: u64,
    settled: bool,
}

impl<T> InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(inner: &Arc<Inner<T>>, done: Completion<T>, id: u64) -> Self {
        inner.inflight.fetch_add(1, Ordering::AcqRel);
        Self {
            inner: Arc::clone(inner),
            done,
            id,
            settled: false,
        }
    }

    /// Stops counting this fetch; must happen before its handle turns terminal.
    fn settle(&mut self) {
        if !self.settled {
            self.settled = true;
            self.inner.inflight.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl<T> Drop for InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if !self.settled {
            self.settle();
            self.inner.cancelled(self.id, &self.done, Some("abandoned"));
        }
    }
}

/// # Asynchronous provider of a single observable value.
///
/// Each [`retrieve`](Self::retrieve) runs the read operation once on the configured
/// executor; successful results replace the slot's value. See the
/// [crate docs](crate) for the full picture.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use datavisor::{DataProvider, FetchError, FetchFn, FetchStatus};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let provider = DataProvider::builder(FetchFn::new("answer", |_ctx: CancellationToken| async {
///     Ok::<_, FetchError>(42u32)
/// }))
/// .build()
/// .unwrap();
///
/// let handle = provider.retrieve();
/// assert_eq!(handle.wait().await, FetchStatus::Succeeded);
/// assert_eq!(provider.slot().get(), Some(42));
/// # }
/// ```
pub struct DataProvider<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<Inner<T>>,
}

impl<T> DataProvider<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Starts building a provider around `read`.
    pub fn builder(read: impl Fetch<T>) -> DataProviderBuilder<T> {
        DataProviderBuilder::new(Arc::new(read))
    }

    pub(super) fn from_inner(inner: Arc<Inner<T>>) -> Self {
        Self { inner }
    }

    /// Starts one fetch and returns its handle immediately.
    ///
    /// Never fails: a refused or failing fetch is reported on the handle and as an
    /// event. Every call starts an independent fetch.
    pub fn retrieve(&self) -> FetchHandle<T> {
        let inner = &self.inner;
        {
            // Same lock as `set_slot`: the swap never lands after this flag.
            let _slot = inner.slot.write().unwrap_or_else(PoisonError::into_inner);
            inner.started.store(true, Ordering::Release);
        }

        let id = inner.next_id();
        let name: Arc<str> = Arc::from(inner.reader.name());
        let token = inner.shutdown.child_token();
        let (done, handle) = Completion::new(id, Arc::clone(&name), token.clone());

        let mut job = InFlight::new(inner, done.clone(), id);
        let job_inner = Arc::clone(inner);
        let job_token = token.clone();
        let fut = in_chain(current_depth(), async move {
            job_inner.run_fetch(&mut job, &job_token).await;
        })
        .boxed();

        let reject_inner = Arc::clone(inner);
        let reject = Box::new(move |err: ExecuteError| {
            reject_inner.failed(id, &done, FetchError::Rejected(err));
        });

        if let Err(rejected) = inner.executor.execute(Job::new(id, name, token, fut, reject)) {
            rejected.finish();
        }
        handle
    }

    /// Handle to the slot results are published into.
    pub fn slot(&self) -> ObservableSlot<T> {
        self.inner.slot()
    }

    /// Replaces the slot.
    ///
    /// Allowed only before the first [`retrieve`](Self::retrieve); later calls are
    /// ignored, return `false` and publish `SlotReplaceRejected`.
    pub fn set_slot(&self, slot: ObservableSlot<T>) -> bool {
        {
            let mut current = self
                .inner
                .slot
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if !self.inner.started.load(Ordering::Acquire) {
                *current = slot;
                return true;
            }
        }
        self.inner
            .emit
            .publish(self.inner.emit.event(EventKind::SlotReplaceRejected));
        false
    }

    /// Removes the write-back handler and releases the current subscriptions.
    pub fn clear_write_back(&self) {
        self.inner.set_write_back(None);
        self.inner.release();
    }

    /// Raw event stream of this provider.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.inner.emit.bus().subscribe()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.inner.phase()
    }

    /// Provider name, as used in events.
    pub fn name(&self) -> &str {
        &self.inner.cfg.name
    }

    /// Number of subscriptions held for the current value.
    pub fn subscription_count(&self) -> usize {
        lock(&self.inner.binding).subscriptions.len()
    }
}

impl<T> DataProvider<T>
where
    T: Inspect + Clone + Send + Sync + 'static,
{
    /// Installs a write-back handler. Takes effect from the next successful fetch.
    pub fn set_write_back(&self, handler: impl WriteBack<T>) {
        self.inner.set_write_back(Some(WriteBackConfig::new(handler)));
    }
}

impl<T> Drop for DataProvider<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
    }
}

impl<T> std::fmt::Debug for DataProvider<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataProvider")
            .field("name", &self.inner.cfg.name)
            .field("executor", &self.inner.executor.name())
            .field("phase", &self.phase())
            .finish()
    }
}
