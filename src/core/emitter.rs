use std::sync::Arc;

use crate::events::{Bus, Event, EventKind};

/// Publishes events stamped with the owning provider's name.
#[derive(Clone, Debug)]
pub(crate) struct Emitter {
    bus: Bus,
    provider: Arc<str>,
}

impl Emitter {
    pub(crate) fn new(bus: Bus, provider: impl Into<Arc<str>>) -> Self {
        Self {
            bus,
            provider: provider.into(),
        }
    }

    /// Starts an event carrying the provider name.
    #[inline]
    pub(crate) fn event(&self, kind: EventKind) -> Event {
        Event::new(kind).with_provider(Arc::clone(&self.provider))
    }

    #[inline]
    pub(crate) fn publish(&self, ev: Event) {
        self.bus.publish(ev);
    }

    pub(crate) fn bus(&self) -> &Bus {
        &self.bus
    }
}
