//! # Fetch handle and completion.
//!
//! Every [`retrieve`](crate::DataProvider::retrieve) returns a [`FetchHandle`] backed by a
//! `tokio::sync::watch` channel. The provider side holds the matching `Completion`.
//!
//! ## State machine
//! ```text
//! Pending ──► Running ──┬──► Succeeded(value)
//!    │                  ├──► Failed(error)
//!    └──────────────────┴──► Cancelled
//! ```
//!
//! ## Rules
//! - A terminal state is written **exactly once**; later attempts are ignored.
//! - The handle never blocks the fetch: dropping every handle does not cancel it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;

/// Full state of one fetch, including its outcome.
#[derive(Debug, Clone)]
pub enum FetchState<T> {
    /// Created, not yet picked up by the executor.
    Pending,
    /// The read operation is running.
    Running,
    /// Finished with a value; the slot already holds it.
    Succeeded(T),
    /// Finished with an error; the slot was not touched.
    Failed(Arc<FetchError>),
    /// Cancelled or abandoned; the slot was not touched.
    Cancelled,
}

impl<T> FetchState<T> {
    /// Value-free summary of this state.
    pub fn status(&self) -> FetchStatus {
        match self {
            FetchState::Pending => FetchStatus::Pending,
            FetchState::Running => FetchStatus::Running,
            FetchState::Succeeded(_) => FetchStatus::Succeeded,
            FetchState::Failed(_) => FetchStatus::Failed,
            FetchState::Cancelled => FetchStatus::Cancelled,
        }
    }
}

/// Value-free fetch status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FetchStatus {
    /// Created, not yet running.
    #[default]
    Pending,
    /// Running.
    Running,
    /// Finished with a value.
    Succeeded,
    /// Finished with an error.
    Failed,
    /// Cancelled or abandoned.
    Cancelled,
}

impl FetchStatus {
    /// True for `Succeeded`, `Failed` and `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FetchStatus::Succeeded | FetchStatus::Failed | FetchStatus::Cancelled
        )
    }
}

/// Handle to one fetch for status queries, waiting and cancellation.
///
/// Cloneable; all clones observe the same fetch.
pub struct FetchHandle<T> {
    id: u64,
    name: Arc<str>,
    state: watch::Receiver<FetchState<T>>,
    token: CancellationToken,
}

impl<T> FetchHandle<T> {
    /// Fetch id, unique per provider (starting from 1).
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name of the read operation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current status (non-blocking).
    pub fn status(&self) -> FetchStatus {
        self.state.borrow().status()
    }

    /// True once the fetch reached a terminal state.
    pub fn is_done(&self) -> bool {
        self.status().is_terminal()
    }

    /// The error, if the fetch failed.
    pub fn error(&self) -> Option<Arc<FetchError>> {
        match &*self.state.borrow() {
            FetchState::Failed(e) => Some(Arc::clone(e)),
            _ => None,
        }
    }

    /// Requests cancellation. A fetch that already finished is unaffected.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Waits until the fetch reaches a terminal state and returns it.
    pub async fn wait(&self) -> FetchStatus {
        let mut rx = self.state.clone();
        let reached = rx
            .wait_for(|s| s.status().is_terminal())
            .await
            .map(|state| state.status());
        match reached {
            Ok(status) => status,
            Err(_) => rx.borrow().status(),
        }
    }
}

impl<T: Clone> FetchHandle<T> {
    /// Current full state.
    pub fn state(&self) -> FetchState<T> {
        self.state.borrow().clone()
    }

    /// The value, if the fetch succeeded.
    pub fn value(&self) -> Option<T> {
        match &*self.state.borrow() {
            FetchState::Succeeded(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Waits for completion and returns the value or the reason there is none.
    pub async fn result(&self) -> Result<T, Arc<FetchError>> {
        self.wait().await;
        match self.state() {
            FetchState::Succeeded(v) => Ok(v),
            FetchState::Failed(e) => Err(e),
            _ => Err(Arc::new(FetchError::Canceled)),
        }
    }
}

impl<T> Clone for FetchHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: Arc::clone(&self.name),
            state: self.state.clone(),
            token: self.token.clone(),
        }
    }
}

impl<T> fmt::Debug for FetchHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("status", &self.status())
            .finish()
    }
}

struct Shared<T> {
    tx: watch::Sender<FetchState<T>>,
    done: AtomicBool,
}

/// Writer side of a [`FetchHandle`]; writes the terminal state exactly once.
pub(crate) struct Completion<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Completion<T> {
    /// Creates a completion and the handle observing it.
    pub(crate) fn new(id: u64, name: Arc<str>, token: CancellationToken) -> (Self, FetchHandle<T>) {
        let (tx, rx) = watch::channel(FetchState::Pending);
        let completion = Self {
            shared: Arc::new(Shared {
                tx,
                done: AtomicBool::new(false),
            }),
        };
        let handle = FetchHandle {
            id,
            name,
            state: rx,
            token,
        };
        (completion, handle)
    }

    pub(crate) fn running(&self) {
        if !self.is_done() {
            self.shared.tx.send_replace(FetchState::Running);
        }
    }

    /// Writes a terminal state. Returns `false` if one was already written.
    pub(crate) fn finish(&self, state: FetchState<T>) -> bool {
        if self.shared.done.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.shared.tx.send_replace(state);
        true
    }

    pub(crate) fn is_done(&self) -> bool {
        self.shared.done.load(Ordering::Acquire)
    }
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}
