//! # Default executor: spawn on a tokio runtime.

use tokio::runtime::Handle;

use super::executor::{Executor, Job, Rejected};

/// Spawns every job as a task on a tokio runtime.
///
/// This is the executor a provider uses when none is configured. It is bound to the
/// runtime captured when the provider was built, never to a process-wide default.
#[derive(Clone, Debug)]
pub struct RuntimeExecutor {
    handle: Handle,
}

impl RuntimeExecutor {
    /// Executor bound to `handle`.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Executor bound to the runtime of the calling context, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Executor for RuntimeExecutor {
    fn execute(&self, job: Job) -> Result<(), Rejected> {
        self.handle.spawn(job.into_future());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "runtime"
    }
}
