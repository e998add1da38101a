//! # Invalidation listeners and subscription guards.
//!
//! [`Listeners`] is the shared registry behind every [`Observable`]. Adding a listener
//! returns a [`Subscription`]; dropping the subscription detaches the listener.
//!
//! ## Rules
//! - `notify()` snapshots the registry and calls listeners **without** holding the lock,
//!   so a listener may add or drop subscriptions (including its own) while running.
//! - Listeners are called in registration order on the notifying thread.
//! - A panicking listener is caught and logged; remaining listeners still run.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::error::panic_message;

/// Payload-free change callback.
pub type InvalidationListener = Arc<dyn Fn() + Send + Sync>;

/// Shared handle to any observable value.
pub type ObservableRef = Arc<dyn Observable>;

/// # Something that can be watched for invalidation.
///
/// Invalidation carries no payload: listeners only learn that state changed and
/// must read the new state themselves.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use datavisor::{Observable, Trigger};
///
/// let trigger = Trigger::new();
/// let hits = Arc::new(AtomicUsize::new(0));
/// let h = hits.clone();
/// let sub = trigger.add_listener(Arc::new(move || { h.fetch_add(1, Ordering::SeqCst); }));
///
/// trigger.fire();
/// drop(sub);
/// trigger.fire();
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// ```
pub trait Observable: Send + Sync + 'static {
    /// Registers `listener`; it stays attached while the returned guard lives.
    fn add_listener(&self, listener: InvalidationListener) -> Subscription;

    /// Number of currently attached listeners.
    fn listener_count(&self) -> usize;
}

#[derive(Default)]
struct Table {
    next_id: u64,
    entries: Vec<(u64, InvalidationListener)>,
}

/// Registry of invalidation listeners.
#[derive(Clone, Default)]
pub(crate) struct Listeners {
    table: Arc<Mutex<Table>>,
}

impl Listeners {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, listener: InvalidationListener) -> Subscription {
        let mut table = lock(&self.table);
        let id = table.next_id;
        table.next_id += 1;
        table.entries.push((id, listener));
        Subscription {
            id,
            table: Arc::downgrade(&self.table),
        }
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.table).entries.len()
    }

    /// Calls every attached listener once.
    pub(crate) fn notify(&self) {
        let snapshot: Vec<InvalidationListener> = lock(&self.table)
            .entries
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in snapshot {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener())) {
                tracing::warn!(
                    target: "datavisor",
                    panic = %panic_message(payload.as_ref()),
                    "invalidation listener panicked"
                );
            }
        }
    }
}

fn lock(table: &Mutex<Table>) -> MutexGuard<'_, Table> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// # Guard for one attached listener.
///
/// Dropping the guard detaches the listener. Outliving the observable is fine:
/// the guard then becomes inert.
#[must_use = "dropping a Subscription detaches its listener immediately"]
pub struct Subscription {
    id: u64,
    table: Weak<Mutex<Table>>,
}

impl Subscription {
    /// True while the listener is still attached to a live observable.
    pub fn is_active(&self) -> bool {
        match self.table.upgrade() {
            Some(table) => lock(&table).entries.iter().any(|(id, _)| *id == self.id),
            None => false,
        }
    }

    /// Detaches the listener now. Same as dropping the guard.
    pub fn release(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            lock(&table).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
