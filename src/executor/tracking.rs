//! # Executor that observes the work submitted to it.
//!
//! [`TrackingExecutor`] spawns jobs on a tokio runtime like
//! [`RuntimeExecutor`](crate::RuntimeExecutor) and additionally keeps a live registry
//! of submitted-but-unfinished jobs, optionally capping how many run at once.
//!
//! ## Architecture
//! ```text
//! execute(job) ──► active[id] = JobInfo ──► spawn {
//!                                            acquire permit (cancellable, optional)
//!                                            run job
//!                                          } ──► drop guard: active.remove(id)
//! ```
//!
//! ## Rules
//! - A job is listed from `execute` until its future finishes **or** is dropped.
//! - Waiting for a permit ends early when the job's token is cancelled; the job is
//!   then dropped unrun and its handle reports `Cancelled`.
//! - After [`close`](TrackingExecutor::close) new jobs are rejected with `ExecuteError::Closed`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::select;
use tokio::sync::{Semaphore, watch};

use super::executor::{Executor, Job, Rejected};
use crate::error::ExecuteError;

/// Snapshot of one tracked job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobInfo {
    /// Submission number, unique per executor (starting from 1).
    pub key: u64,
    /// Fetch id, unique per provider only.
    pub id: u64,
    /// Operation name.
    pub name: Arc<str>,
}

struct Tracker {
    handle: Handle,
    limit: Option<usize>,
    semaphore: Option<Arc<Semaphore>>,
    active: Mutex<BTreeMap<u64, JobInfo>>,
    count: watch::Sender<usize>,
    closed: AtomicBool,
    next_key: AtomicU64,
}

impl Tracker {
    fn active(&self) -> MutexGuard<'_, BTreeMap<u64, JobInfo>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, id: u64, name: &str) -> u64 {
        let key = self.next_key.fetch_add(1, Ordering::Relaxed) + 1;
        let mut active = self.active();
        active.insert(
            key,
            JobInfo {
                key,
                id,
                name: Arc::from(name),
            },
        );
        self.count.send_replace(active.len());
        key
    }

    fn remove(&self, key: u64) {
        let mut active = self.active();
        active.remove(&key);
        self.count.send_replace(active.len());
    }
}

/// Removes a job from the registry however its future ends.
struct Tracked {
    tracker: Arc<Tracker>,
    key: u64,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.tracker.remove(self.key);
    }
}

/// Executor with a live view of submitted work.
///
/// # Example
/// ```
/// use datavisor::TrackingExecutor;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let executor = TrackingExecutor::current().unwrap().with_limit(4);
/// assert_eq!(executor.active_count(), 0);
/// assert_eq!(executor.limit(), Some(4));
/// # }
/// ```
#[derive(Clone)]
pub struct TrackingExecutor {
    tracker: Arc<Tracker>,
}

impl TrackingExecutor {
    /// Executor bound to `handle`, without a concurrency limit.
    pub fn new(handle: Handle) -> Self {
        Self::build(handle, None)
    }

    fn build(handle: Handle, limit: Option<usize>) -> Self {
        let (count, _rx) = watch::channel(0);
        Self {
            tracker: Arc::new(Tracker {
                handle,
                limit,
                semaphore: limit.map(|n| Arc::new(Semaphore::new(n))),
                active: Mutex::new(BTreeMap::new()),
                count,
                closed: AtomicBool::new(false),
                next_key: AtomicU64::new(0),
            }),
        }
    }

    /// Executor bound to the runtime of the calling context, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Returns a fresh executor on the same runtime that runs at most `limit` jobs
    /// at once (`0` = unlimited).
    pub fn with_limit(self, limit: usize) -> Self {
        Self::build(self.tracker.handle.clone(), (limit > 0).then_some(limit))
    }

    /// Concurrency limit, if any.
    pub fn limit(&self) -> Option<usize> {
        self.tracker.limit
    }

    /// Jobs submitted and not yet finished, in submission order.
    pub fn active(&self) -> Vec<JobInfo> {
        self.tracker.active().values().cloned().collect()
    }

    /// Number of jobs submitted and not yet finished.
    pub fn active_count(&self) -> usize {
        *self.tracker.count.borrow()
    }

    /// Receiver notified whenever the number of active jobs changes.
    pub fn watch_active(&self) -> watch::Receiver<usize> {
        self.tracker.count.subscribe()
    }

    /// Stops accepting new jobs; jobs already submitted keep running.
    pub fn close(&self) {
        self.tracker.closed.store(true, Ordering::Release);
    }

    /// True after [`close`](Self::close).
    pub fn is_closed(&self) -> bool {
        self.tracker.closed.load(Ordering::Acquire)
    }
}

impl Executor for TrackingExecutor {
    fn execute(&self, job: Job) -> Result<(), Rejected> {
        if self.is_closed() {
            return Err(Rejected {
                job,
                error: ExecuteError::Closed,
            });
        }

        let key = self.tracker.insert(job.id(), job.name());
        let guard = Tracked {
            tracker: Arc::clone(&self.tracker),
            key,
        };
        let semaphore = self.tracker.semaphore.clone();
        let token = job.token().clone();
        let fut = job.into_future();

        self.tracker.handle.spawn(async move {
            let _guard = guard;
            let _permit = match semaphore {
                Some(sem) => {
                    select! {
                        biased;
                        _ = token.cancelled() => return,
                        res = sem.acquire_owned() => match res {
                            Ok(permit) => Some(permit),
                            Err(_closed) => return,
                        },
                    }
                }
                None => None,
            };
            fut.await;
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tracking"
    }
}

impl std::fmt::Debug for TrackingExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingExecutor")
            .field("active", &self.active_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}
