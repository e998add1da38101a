//! # Observable single-value slot.
//!
//! [`ObservableSlot`] holds the current value (`Option<T>`) and notifies on every write.
//! Two observation styles are offered over the same cell:
//! - **Invalidation listeners** via [`Observable::add_listener`], called synchronously
//!   on the writing thread.
//! - **Async watchers** via [`ObservableSlot::watch`], a `tokio::sync::watch` receiver.
//!
//! ## Rules
//! - Every `set` notifies, even when the new value equals the old one.
//! - The value is updated **before** listeners run, so a listener reading the slot
//!   sees the value that triggered it (or a newer one).
//! - Readers never observe a torn value; a concurrent `get` sees old or new.
//! - Clones share the cell.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use super::listeners::{InvalidationListener, Listeners, Observable, Subscription};

struct SlotInner<T> {
    value: watch::Sender<Option<T>>,
    listeners: Listeners,
    version: AtomicU64,
}

/// Shared, observable cell holding at most one value.
///
/// # Example
/// ```
/// use datavisor::ObservableSlot;
///
/// let slot = ObservableSlot::new();
/// let watcher = slot.watch();
/// assert_eq!(slot.get(), None::<u32>);
///
/// slot.set(7);
/// assert_eq!(slot.get(), Some(7));
/// assert_eq!(*watcher.borrow(), Some(7));
/// assert_eq!(slot.version(), 1);
/// ```
pub struct ObservableSlot<T> {
    inner: Arc<SlotInner<T>>,
}

impl<T> ObservableSlot<T> {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::from_option(None)
    }

    /// Creates a slot that already holds `value`.
    pub fn with_value(value: T) -> Self {
        Self::from_option(Some(value))
    }

    fn from_option(init: Option<T>) -> Self {
        let (value, _rx) = watch::channel(init);
        Self {
            inner: Arc::new(SlotInner {
                value,
                listeners: Listeners::new(),
                version: AtomicU64::new(0),
            }),
        }
    }

    /// Replaces the value and notifies watchers and listeners.
    pub fn set(&self, value: T) {
        self.inner.value.send_replace(Some(value));
        self.changed();
    }

    /// Empties the slot and notifies.
    pub fn clear(&self) {
        self.inner.value.send_replace(None);
        self.changed();
    }

    /// Notifies watchers and listeners without touching the value.
    pub fn invalidate(&self) {
        self.inner.value.send_modify(|_| {});
        self.changed();
    }

    /// Runs `f` against the current value.
    ///
    /// The slot is read-locked while `f` runs; writing to the same slot from `f`
    /// deadlocks.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.inner.value.borrow().as_ref())
    }

    /// True if the slot currently holds a value.
    pub fn is_set(&self) -> bool {
        self.inner.value.borrow().is_some()
    }

    /// Number of notifications issued so far.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Async receiver that observes every subsequent notification.
    pub fn watch(&self) -> watch::Receiver<Option<T>> {
        self.inner.value.subscribe()
    }

    /// True if both handles point to the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn changed(&self) {
        self.inner.version.fetch_add(1, Ordering::AcqRel);
        self.inner.listeners.notify();
    }
}

impl<T: Clone> ObservableSlot<T> {
    /// Returns a clone of the current value.
    pub fn get(&self) -> Option<T> {
        self.inner.value.borrow().clone()
    }
}

impl<T> Clone for ObservableSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for ObservableSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableSlot")
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.version())
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

impl<T: Send + Sync + 'static> Observable for ObservableSlot<T> {
    fn add_listener(&self, listener: InvalidationListener) -> Subscription {
        self.inner.listeners.add(listener)
    }

    fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }
}
