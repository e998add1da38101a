//! # Value-less invalidation source.

use super::listeners::{InvalidationListener, Listeners, Observable, Subscription};

/// Observable that carries no value; [`fire`](Trigger::fire) only signals change.
///
/// Handy as a member of a result type that should re-trigger write-back on demand
/// (a "dirty" flag, a refresh button). Clones share the listener set.
#[derive(Clone, Default)]
pub struct Trigger {
    listeners: Listeners,
}

impl Trigger {
    /// Creates a trigger with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifies every attached listener.
    pub fn fire(&self) {
        self.listeners.notify();
    }
}

impl Observable for Trigger {
    fn add_listener(&self, listener: InvalidationListener) -> Subscription {
        self.listeners.add(listener)
    }

    fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
