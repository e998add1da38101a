//! # Execution contract.
//!
//! An [`Executor`] accepts a [`Job`] and runs it to completion at most once. The job
//! carries everything needed to report its own outcome, so the executor only decides
//! *where* and *when* it runs:
//!
//! ```text
//! DataProvider::retrieve()
//!     └─► Job { id, name, token, future, reject }
//!            └─► Executor::execute(job)
//!                   ├─ Ok(())                → future runs → handle: Succeeded/Failed/Cancelled
//!                   ├─ Err(Rejected{job,..}) → job.reject(error) → handle: Failed(Rejected)
//!                   └─ job dropped unrun     → handle: Cancelled
//! ```

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::ExecuteError;

/// Shared handle to an executor.
pub type ExecutorRef = Arc<dyn Executor>;

/// # Runs jobs off the caller's path.
///
/// Implementations must either run the job's future, return it inside
/// [`Rejected`], or drop it. Each of those reports to the fetch handle exactly once.
pub trait Executor: Send + Sync + 'static {
    /// Schedules `job`.
    fn execute(&self, job: Job) -> Result<(), Rejected>;

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// One unit of work submitted by a provider.
pub struct Job {
    id: u64,
    name: Arc<str>,
    token: CancellationToken,
    fut: BoxFuture<'static, ()>,
    reject: Box<dyn FnOnce(ExecuteError) + Send>,
}

impl Job {
    pub(crate) fn new(
        id: u64,
        name: Arc<str>,
        token: CancellationToken,
        fut: BoxFuture<'static, ()>,
        reject: Box<dyn FnOnce(ExecuteError) + Send>,
    ) -> Self {
        Self {
            id,
            name,
            token,
            fut,
            reject,
        }
    }

    /// Fetch id this job belongs to.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name of the operation being run.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cancellation token of the fetch. Executors that queue jobs should stop
    /// waiting once it is cancelled.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Converts the job into the future to run.
    pub fn into_future(self) -> BoxFuture<'static, ()> {
        self.fut
    }

    /// Runs the job on the current task.
    pub async fn run(self) {
        self.fut.await;
    }

    /// Completes the job as rejected without running it.
    pub fn reject(self, error: ExecuteError) {
        let Job { reject, fut, .. } = self;
        reject(error);
        drop(fut);
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

/// A job handed back by an executor that refused it.
#[derive(Debug)]
pub struct Rejected {
    /// The refused job, still unrun.
    pub job: Job,
    /// Why it was refused.
    pub error: ExecuteError,
}

impl Rejected {
    /// Completes the refused job as failed.
    pub fn finish(self) {
        self.job.reject(self.error);
    }
}
