//! # Write-back loop.
//!
//! After a successful fetch the provider scans the new value for observable members
//! and attaches one invalidation listener to each. An invalidation asks the configured
//! [`WriteBack`] handler for an operation, built from the value the slot holds *at
//! that moment*, and runs it fire-and-forget on the provider's executor.
//!
//! ## Flow
//! ```text
//! member invalidated ──► listener (on the invalidating thread)
//!     ├─ write-back cleared          → ignore
//!     ├─ depth + 1 > limit           → WriteBackSuppressed
//!     ├─ slot empty                  → WriteBackSkipped
//!     └─ handler.create_fetch(value) → WriteBackFired ──► executor
//!                                         ├─ Ok(())  → WriteBackCompleted
//!                                         └─ Err(e)  → WriteBackFailed
//! ```
//!
//! ## Rules
//! - The handler is called synchronously, exactly once per invalidation.
//! - The returned operation does **not** run on the invalidating thread: [`Fetch`]
//!   is async and cannot be blocked on from inside a runtime worker, so it is handed
//!   to the provider's executor and `fire()`/`set()` return before it completes.
//! - Depth is counted on both paths. While the handler runs (and while the op is
//!   submitted) the invalidating thread carries the handler's depth, so a handler that
//!   touches its own members re-enters one level deeper. The op itself runs inside a
//!   task scope at the same depth; work it detaches onto other tasks starts over at 0.
//! - Listeners hold a weak reference to the provider and go quiet once it is dropped,
//!   or once the binding they belong to has been released.
//!
//! [`Fetch`]: crate::Fetch

use std::borrow::Cow;
use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

use futures::FutureExt;

use super::provider::Inner;
use super::runner::run_once;
use crate::error::{ExecuteError, panic_message};
use crate::events::EventKind;
use crate::executor::Job;
use crate::fetch::FetchRef;
use crate::observable::InvalidationListener;
use crate::scan::{Inspect, Scan, scan};

tokio::task_local! {
    static CHAIN_DEPTH: u32;
}

thread_local! {
    static SYNC_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Write-back depth of the running code (0 outside any write-back).
///
/// The deeper of the task scope and the synchronous handler scope on this thread.
pub(crate) fn current_depth() -> u32 {
    let task = CHAIN_DEPTH.try_with(|d| *d).unwrap_or(0);
    task.max(SYNC_DEPTH.with(Cell::get))
}

/// Marks this thread as running a write-back handler at `depth` until dropped.
struct SyncScope {
    prev: u32,
}

impl SyncScope {
    fn enter(depth: u32) -> Self {
        Self {
            prev: SYNC_DEPTH.with(|d| d.replace(depth)),
        }
    }
}

impl Drop for SyncScope {
    fn drop(&mut self) {
        SYNC_DEPTH.with(|d| d.set(self.prev));
    }
}

/// Runs `fut` with the given chain depth.
pub(crate) fn in_chain<F>(depth: u32, fut: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    CHAIN_DEPTH.scope(depth, fut)
}

/// # Builds the operation that writes a changed value back.
///
/// Called synchronously on the thread that raised the invalidation, with the value
/// the slot holds at that moment. The returned operation is submitted to the
/// provider's executor, so the invalidating call returns before it has run; its
/// outcome is reported as `WriteBackCompleted` or `WriteBackFailed`.
///
/// Implemented for every `Fn(T) -> FetchRef<()>` closure.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use datavisor::{FetchError, FetchFn, FetchRef, WriteBack};
///
/// fn save(name: String) -> FetchRef<()> {
///     FetchFn::arc("save", move |_ctx: CancellationToken| {
///         let name = name.clone();
///         async move {
///             let _ = name;
///             Ok::<_, FetchError>(())
///         }
///     })
/// }
///
/// let handler: &dyn WriteBack<String> = &save;
/// assert_eq!(handler.create_fetch("x".into()).name(), "save");
/// ```
pub trait WriteBack<T>: Send + Sync + 'static {
    /// Returns the operation to run for the current slot value.
    fn create_fetch(&self, current: T) -> FetchRef<()>;
}

impl<T, F> WriteBack<T> for F
where
    F: Fn(T) -> FetchRef<()> + Send + Sync + 'static,
{
    fn create_fetch(&self, current: T) -> FetchRef<()> {
        self(current)
    }
}

/// Installed write-back: the handler plus the scanner for `T`.
pub(crate) struct WriteBackConfig<T> {
    pub(crate) handler: Arc<dyn WriteBack<T>>,
    pub(crate) scan: fn(&T) -> Scan,
}

impl<T: Inspect> WriteBackConfig<T> {
    pub(crate) fn new(handler: impl WriteBack<T>) -> Self {
        Self {
            handler: Arc::new(handler),
            scan: scan::<T>,
        }
    }
}

impl<T> Clone for WriteBackConfig<T> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            scan: self.scan,
        }
    }
}

impl<T> Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Listener attached to one discovered member of binding `generation`.
    pub(super) fn listener_for(
        self: &Arc<Self>,
        member: &Cow<'static, str>,
        generation: u64,
    ) -> InvalidationListener {
        let weak: Weak<Self> = Arc::downgrade(self);
        let member: Arc<str> = Arc::from(member.as_ref());
        Arc::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            // A notify may still hold this listener after its binding was released.
            if inner.generation.load(Ordering::Acquire) == generation {
                inner.on_invalidated(&member);
            }
        })
    }

    fn on_invalidated(self: &Arc<Self>, member: &Arc<str>) {
        let Some(cfg) = self.write_back() else {
            return;
        };

        let depth = current_depth().saturating_add(1);
        if depth > self.cfg.write_back_depth_limit() {
            self.emit.publish(
                self.emit
                    .event(EventKind::WriteBackSuppressed)
                    .with_member(Arc::clone(member))
                    .with_depth(depth),
            );
            return;
        }

        let Some(current) = self.slot().get() else {
            self.emit.publish(
                self.emit
                    .event(EventKind::WriteBackSkipped)
                    .with_member(Arc::clone(member)),
            );
            return;
        };

        let _scope = SyncScope::enter(depth);
        let op = match catch_unwind(AssertUnwindSafe(|| cfg.handler.create_fetch(current))) {
            Ok(op) => op,
            Err(payload) => {
                self.emit.publish(
                    self.emit
                        .event(EventKind::WriteBackFailed)
                        .with_member(Arc::clone(member))
                        .with_reason(format!(
                            "handler panicked: {}",
                            panic_message(payload.as_ref())
                        )),
                );
                return;
            }
        };

        self.dispatch(op, Arc::clone(member), depth);
    }

    fn dispatch(self: &Arc<Self>, op: FetchRef<()>, member: Arc<str>, depth: u32) {
        let id = self.next_id();
        let name: Arc<str> = Arc::from(op.name());
        let token = self.shutdown.child_token();

        self.emit.publish(
            self.emit
                .event(EventKind::WriteBackFired)
                .with_fetch(id)
                .with_member(Arc::clone(&member))
                .with_depth(depth),
        );

        let emit = self.emit.clone();
        let timeout = self.cfg.fetch_timeout();
        let job_token = token.clone();
        let job_member = Arc::clone(&member);
        let fut = in_chain(depth, async move {
            match run_once(op.as_ref(), &job_token, timeout, &emit, id).await {
                Ok(()) => emit.publish(
                    emit.event(EventKind::WriteBackCompleted)
                        .with_fetch(id)
                        .with_member(job_member),
                ),
                Err(e) if e.is_cancellation() => emit.publish(
                    emit.event(EventKind::FetchCancelled)
                        .with_fetch(id)
                        .with_member(job_member),
                ),
                Err(e) => emit.publish(
                    emit.event(EventKind::WriteBackFailed)
                        .with_fetch(id)
                        .with_member(job_member)
                        .with_reason(e.to_string()),
                ),
            }
        })
        .boxed();

        let emit = self.emit.clone();
        let reject = Box::new(move |err: ExecuteError| {
            emit.publish(
                emit.event(EventKind::WriteBackFailed)
                    .with_fetch(id)
                    .with_member(member)
                    .with_reason(format!("rejected by executor: {err}")),
            );
        });

        if let Err(rejected) = self.executor.execute(Job::new(id, name, token, fut, reject)) {
            rejected.finish();
        }
    }
}
