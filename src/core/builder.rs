use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::select;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio_util::sync::CancellationToken;

use super::config::ProviderConfig;
use super::emitter::Emitter;
use super::provider::{DataProvider, Inner};
use super::writeback::{WriteBack, WriteBackConfig};
use crate::error::ProviderError;
use crate::events::Bus;
use crate::executor::{ExecutorRef, RuntimeExecutor};
use crate::fetch::FetchRef;
use crate::observable::ObservableSlot;
use crate::scan::Inspect;
use crate::subscribers::{LogWriter, Subscribe, SubscriberSet};

/// Builder for a [`DataProvider`].
///
/// Everything except the read operation is optional:
/// - executor: a [`RuntimeExecutor`] on the runtime captured by [`build`](Self::build)
/// - subscribers: a single [`LogWriter`]
/// - slot: a fresh empty [`ObservableSlot`]
/// - write-back: none
pub struct DataProviderBuilder<T> {
    read: FetchRef<T>,
    cfg: ProviderConfig,
    executor: Option<ExecutorRef>,
    subscribers: Option<Vec<Arc<dyn Subscribe>>>,
    write_back: Option<WriteBackConfig<T>>,
    slot: Option<ObservableSlot<T>>,
    runtime: Option<Handle>,
}

impl<T> DataProviderBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(read: FetchRef<T>) -> Self {
        Self {
            read,
            cfg: ProviderConfig::default(),
            executor: None,
            subscribers: None,
            write_back: None,
            slot: None,
            runtime: None,
        }
    }

    /// Sets the provider configuration.
    pub fn with_config(mut self, cfg: ProviderConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Runs fetches and write-backs on `executor` instead of the runtime default.
    pub fn with_executor(mut self, executor: ExecutorRef) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Replaces the default subscribers (a single [`LogWriter`]).
    ///
    /// An empty list disables fan-out; [`DataProvider::events`] still works.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = Some(subscribers);
        self
    }

    /// Publishes into `slot` instead of a fresh one.
    pub fn with_slot(mut self, slot: ObservableSlot<T>) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Uses `handle` for the default executor and the event workers.
    ///
    /// Needed only when [`build`](Self::build) runs outside a tokio runtime.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Builds the provider.
    ///
    /// Spawns the event listener and subscriber workers on the captured runtime.
    ///
    /// # Errors
    /// [`ProviderError::NoRuntime`] when called outside a tokio runtime without
    /// [`with_runtime`](Self::with_runtime).
    pub fn build(self) -> Result<DataProvider<T>, ProviderError> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| ProviderError::NoRuntime)?,
        };

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let emit = Emitter::new(bus.clone(), self.cfg.name.as_str());
        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(RuntimeExecutor::new(runtime.clone())));
        let subscribers = self
            .subscribers
            .unwrap_or_else(|| vec![Arc::new(LogWriter::new()) as Arc<dyn Subscribe>]);

        let inner = Arc::new(Inner::new(
            self.cfg,
            emit,
            executor,
            self.read,
            self.slot.unwrap_or_default(),
            self.write_back,
        ));

        let set = SubscriberSet::new(subscribers, bus.clone(), &runtime);
        if !set.is_empty() {
            spawn_listener(&runtime, bus, set, inner.shutdown.clone());
        }
        Ok(DataProvider::from_inner(inner))
    }
}

impl<T> DataProviderBuilder<T>
where
    T: Inspect + Clone + Send + Sync + 'static,
{
    /// Installs a write-back handler.
    ///
    /// After every successful fetch the value is scanned and each observable member
    /// it reports gets a listener that calls `handler` on invalidation.
    pub fn with_write_back(mut self, handler: impl WriteBack<T>) -> Self {
        self.write_back = Some(WriteBackConfig::new(handler));
        self
    }
}

/// Forwards bus events to the subscriber set until `stop` fires, then drains and
/// shuts the workers down.
fn spawn_listener(runtime: &Handle, bus: Bus, set: SubscriberSet, stop: CancellationToken) {
    let mut rx = bus.subscribe();
    runtime.spawn(async move {
        loop {
            select! {
                biased;
                ev = rx.recv() => match ev {
                    Ok(ev) => set.emit(ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(target: "datavisor", skipped, "event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = stop.cancelled() => break,
            }
        }
        loop {
            match rx.try_recv() {
                Ok(ev) => set.emit(ev),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        set.shutdown().await;
    });
}
