use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use datavisor::{
    BoxFetchFuture, DataProvider, Event, EventKind, ExecuteError, Executor, Fetch, FetchError,
    FetchFn, FetchRef, FetchStatus, Inspect, InvalidationListener, Job, Members, Observable,
    ObservableSlot, Phase, ProviderConfig, Rejected, Subscribe, Subscription, TrackingExecutor,
    Trigger,
};

const WAIT: Duration = Duration::from_secs(5);

/// Forwards every event to the test.
struct Collect(mpsc::UnboundedSender<Event>);

#[async_trait]
impl Subscribe for Collect {
    async fn on_event(&self, event: &Event) {
        let _ = self.0.send(event.clone());
    }
    fn name(&self) -> &'static str {
        "collect"
    }
}

fn collector() -> (Arc<dyn Subscribe>, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(Collect(tx)), rx)
}

async fn next_of(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Ok(ev) if ev.kind == kind => return ev,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("bus closed"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {kind:?} event"))
}

async fn collected(rx: &mut mpsc::UnboundedReceiver<Event>, kind: EventKind) -> Event {
    timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Some(ev) if ev.kind == kind => return ev,
                Some(_) => continue,
                None => panic!("collector closed"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {kind:?} event at the sink"))
}

fn quiet() -> Vec<Arc<dyn Subscribe>> {
    Vec::new()
}

fn ok_write_back() -> FetchRef<()> {
    FetchFn::arc("save", |_ctx: CancellationToken| async { Ok(()) })
}

#[derive(Clone, Debug, PartialEq)]
struct Settings {
    theme: String,
}

#[derive(Clone)]
struct Profile {
    name: String,
    counter: ObservableSlot<u32>,
}

impl Inspect for Profile {
    fn inspect(&self, members: &mut Members) {
        members.observe("counter", &self.counter);
    }
}

#[tokio::test]
async fn plain_value_is_published_without_bindings() {
    let provider = DataProvider::builder(FetchFn::new("settings", |_ctx: CancellationToken| async {
        Ok(Settings {
            theme: "dark".into(),
        })
    }))
    .with_subscribers(quiet())
    .build()
    .unwrap();
    assert_eq!(provider.phase(), Phase::Idle);

    let handle = provider.retrieve();
    assert_eq!(handle.wait().await, FetchStatus::Succeeded);

    assert_eq!(
        provider.slot().get(),
        Some(Settings {
            theme: "dark".into()
        })
    );
    assert_eq!(handle.value(), provider.slot().get());
    assert_eq!(provider.subscription_count(), 0);
    assert_eq!(provider.phase(), Phase::Published);
}

#[tokio::test]
async fn invalidated_member_fires_write_back_once_with_current_value() {
    let seen: Arc<Mutex<Vec<(String, Option<u32>)>>> = Arc::default();
    let sink = Arc::clone(&seen);

    let provider = DataProvider::builder(FetchFn::new("profile", |_ctx: CancellationToken| async {
        Ok(Profile {
            name: "ada".into(),
            counter: ObservableSlot::with_value(0),
        })
    }))
    .with_subscribers(quiet())
    .with_write_back(move |p: Profile| -> FetchRef<()> {
        sink.lock().unwrap().push((p.name.clone(), p.counter.get()));
        ok_write_back()
    })
    .build()
    .unwrap();
    let mut events = provider.events();

    provider.retrieve().wait().await;
    assert_eq!(provider.subscription_count(), 1);
    assert_eq!(provider.phase(), Phase::Watching);
    assert!(seen.lock().unwrap().is_empty());

    let profile = provider.slot().get().unwrap();
    profile.counter.set(1);

    assert_eq!(*seen.lock().unwrap(), vec![("ada".to_string(), Some(1))]);
    let fired = next_of(&mut events, EventKind::WriteBackFired).await;
    assert_eq!(fired.member.as_deref(), Some("counter"));
    assert_eq!(fired.depth, Some(1));
    next_of(&mut events, EventKind::WriteBackCompleted).await;
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_read_leaves_slot_empty_and_reaches_sink() {
    let (sink, mut rx) = collector();
    let provider = DataProvider::builder(FetchFn::new("broken", |_ctx: CancellationToken| async {
        Err::<u32, _>(FetchError::fail("connection refused"))
    }))
    .with_subscribers(vec![sink])
    .build()
    .unwrap();

    let handle = provider.retrieve();
    assert_eq!(handle.wait().await, FetchStatus::Failed);
    assert_eq!(handle.error().unwrap().as_label(), "fetch_failed");
    assert_eq!(provider.slot().get(), None);

    let ev = collected(&mut rx, EventKind::FetchFailed).await;
    assert_eq!(ev.provider.as_deref(), Some("provider"));
    assert_eq!(ev.fetch, Some(handle.id()));
    assert!(ev.reason.as_deref().unwrap().contains("connection refused"));
}

/// Each call waits for the next gate in line and yields the value sent through it.
struct Gated(Mutex<VecDeque<oneshot::Receiver<u32>>>);

impl Fetch<u32> for Gated {
    fn name(&self) -> &str {
        "gated"
    }

    fn fetch(&self, _ctx: CancellationToken) -> BoxFetchFuture<u32> {
        let gate = self.0.lock().unwrap().pop_front();
        Box::pin(async move {
            match gate {
                Some(rx) => rx.await.map_err(FetchError::fail),
                None => Err(FetchError::fail("no gate left")),
            }
        })
    }
}

fn gated(n: usize) -> (Gated, Vec<oneshot::Sender<u32>>) {
    let (txs, rxs): (Vec<_>, VecDeque<_>) = (0..n).map(|_| oneshot::channel()).unzip();
    (Gated(Mutex::new(rxs)), txs)
}

#[tokio::test]
async fn last_completion_wins_regardless_of_submission_order() {
    let (read, mut gates) = gated(2);
    let provider = DataProvider::builder(read)
        .with_subscribers(quiet())
        .build()
        .unwrap();
    let mut watch = provider.slot().watch();

    let first = provider.retrieve();
    let second = provider.retrieve();
    tokio::task::yield_now().await;
    assert_eq!(provider.phase(), Phase::Fetching);

    let early = gates.pop().unwrap();
    let late = gates.pop().unwrap();

    early.send(2).unwrap();
    timeout(WAIT, watch.wait_for(|v| *v == Some(2)))
        .await
        .unwrap()
        .unwrap();

    late.send(1).unwrap();
    assert_eq!(first.wait().await, FetchStatus::Succeeded);
    assert_eq!(second.wait().await, FetchStatus::Succeeded);

    assert_eq!(provider.slot().get(), Some(1));
    let mut values = vec![first.value().unwrap(), second.value().unwrap()];
    values.sort_unstable();
    assert_eq!(values, vec![1, 2]);
}

#[derive(Clone)]
struct Guarded {
    first: Trigger,
    second: Trigger,
}

impl Inspect for Guarded {
    fn inspect(&self, members: &mut Members) {
        members
            .observe("first", &self.first)
            .observe_with("locked", || -> Result<Trigger, String> {
                Err("access denied".into())
            })
            .observe("second", &self.second);
    }
}

#[tokio::test]
async fn inaccessible_member_is_skipped_and_the_rest_bound() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let value = Guarded {
        first: Trigger::new(),
        second: Trigger::new(),
    };
    let served = value.clone();

    let provider = DataProvider::builder(FetchFn::new("guarded", move |_ctx: CancellationToken| {
        let v = served.clone();
        async move { Ok(v) }
    }))
    .with_subscribers(quiet())
    .with_write_back(move |_: Guarded| {
        counted.fetch_add(1, Ordering::SeqCst);
        ok_write_back()
    })
    .build()
    .unwrap();
    let mut events = provider.events();

    provider.retrieve().wait().await;

    let skipped = next_of(&mut events, EventKind::MemberSkipped).await;
    assert_eq!(skipped.member.as_deref(), Some("locked"));
    assert_eq!(skipped.reason.as_deref(), Some("access denied"));
    let bound = next_of(&mut events, EventKind::DependenciesBound).await;
    assert_eq!(bound.count, Some(2));

    value.first.fire();
    value.second.fire();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[derive(Clone)]
struct Tagged {
    n: usize,
    dirty: Trigger,
}

impl Inspect for Tagged {
    fn inspect(&self, members: &mut Members) {
        members.observe("dirty", &self.dirty);
    }
}

#[tokio::test]
async fn superseded_value_releases_its_subscriptions() {
    let issued: Arc<Mutex<Vec<Trigger>>> = Arc::default();
    let record = Arc::clone(&issued);
    let count = Arc::new(AtomicUsize::new(0));
    let seen: Arc<Mutex<Vec<usize>>> = Arc::default();
    let sink = Arc::clone(&seen);

    let provider = DataProvider::builder(FetchFn::new("tagged", move |_ctx: CancellationToken| {
        let dirty = Trigger::new();
        record.lock().unwrap().push(dirty.clone());
        let n = count.fetch_add(1, Ordering::SeqCst) + 1;
        async move { Ok(Tagged { n, dirty }) }
    }))
    .with_subscribers(quiet())
    .with_write_back(move |t: Tagged| {
        sink.lock().unwrap().push(t.n);
        ok_write_back()
    })
    .build()
    .unwrap();
    let mut events = provider.events();

    provider.retrieve().wait().await;
    provider.retrieve().wait().await;

    let released = next_of(&mut events, EventKind::SubscriptionsReleased).await;
    assert_eq!(released.count, Some(1));

    let triggers = issued.lock().unwrap().clone();
    assert_eq!(triggers[0].listener_count(), 0);
    assert_eq!(triggers[1].listener_count(), 1);

    triggers[0].fire();
    assert!(seen.lock().unwrap().is_empty());
    triggers[1].fire();
    assert_eq!(*seen.lock().unwrap(), vec![2]);
}

#[tokio::test]
async fn write_back_uses_the_value_present_at_invalidation() {
    let dirty = Trigger::new();
    let shared = dirty.clone();
    let count = Arc::new(AtomicUsize::new(0));
    let seen: Arc<Mutex<Vec<usize>>> = Arc::default();
    let sink = Arc::clone(&seen);

    let provider = DataProvider::builder(FetchFn::new("tagged", move |_ctx: CancellationToken| {
        let value = Tagged {
            n: count.fetch_add(1, Ordering::SeqCst) + 1,
            dirty: shared.clone(),
        };
        async move { Ok(value) }
    }))
    .with_subscribers(quiet())
    .with_write_back(move |t: Tagged| {
        sink.lock().unwrap().push(t.n);
        ok_write_back()
    })
    .build()
    .unwrap();

    provider.retrieve().wait().await;
    provider.retrieve().wait().await;
    assert_eq!(dirty.listener_count(), 1);

    dirty.fire();
    assert_eq!(*seen.lock().unwrap(), vec![2]);
}

#[tokio::test]
async fn self_triggering_write_back_stops_at_depth_limit() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let dirty = Trigger::new();
    let served = dirty.clone();

    let provider = DataProvider::builder(FetchFn::new("loop", move |_ctx: CancellationToken| {
        let value = Tagged {
            n: 0,
            dirty: served.clone(),
        };
        async move { Ok(value) }
    }))
    .with_config(ProviderConfig {
        max_write_back_depth: 3,
        ..ProviderConfig::named("looping")
    })
    .with_subscribers(quiet())
    .with_write_back(move |t: Tagged| -> FetchRef<()> {
        counted.fetch_add(1, Ordering::SeqCst);
        FetchFn::arc("re-dirty", move |_ctx: CancellationToken| {
            let dirty = t.dirty.clone();
            async move {
                dirty.fire();
                Ok(())
            }
        })
    })
    .build()
    .unwrap();
    let mut events = provider.events();

    provider.retrieve().wait().await;
    dirty.fire();

    let suppressed = next_of(&mut events, EventKind::WriteBackSuppressed).await;
    assert_eq!(suppressed.depth, Some(4));
    assert_eq!(suppressed.provider.as_deref(), Some("looping"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn handler_touching_its_own_member_stops_at_depth_limit() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);

    let provider = DataProvider::builder(FetchFn::new("profile", |_ctx: CancellationToken| async {
        Ok(Profile {
            name: "ada".into(),
            counter: ObservableSlot::with_value(0),
        })
    }))
    .with_config(ProviderConfig {
        max_write_back_depth: 3,
        ..ProviderConfig::named("marking")
    })
    .with_subscribers(quiet())
    .with_write_back(move |p: Profile| -> FetchRef<()> {
        counted.fetch_add(1, Ordering::SeqCst);
        // Marks the value as saving, which invalidates the member again.
        p.counter.set(p.counter.get().unwrap_or(0) + 1);
        ok_write_back()
    })
    .build()
    .unwrap();
    let mut events = provider.events();

    provider.retrieve().wait().await;
    let current = provider.slot().get().unwrap();
    current.counter.set(1);

    let suppressed = next_of(&mut events, EventKind::WriteBackSuppressed).await;
    assert_eq!(suppressed.depth, Some(4));
    assert_eq!(suppressed.member.as_deref(), Some("counter"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(current.counter.get(), Some(4));
}

#[tokio::test]
async fn slot_listener_re_invalidating_a_member_stops_at_depth_limit() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let dirty = Trigger::new();
    let served = dirty.clone();
    let slot: ObservableSlot<Tagged> = ObservableSlot::new();
    let touched = slot.clone();

    // Every change of the published slot marks the value dirty again.
    let refire = dirty.clone();
    let _echo: Subscription = slot.add_listener(Arc::new(move || refire.fire()));

    let provider = DataProvider::builder(FetchFn::new("echo", move |_ctx: CancellationToken| {
        let value = Tagged {
            n: 0,
            dirty: served.clone(),
        };
        async move { Ok(value) }
    }))
    .with_config(ProviderConfig {
        max_write_back_depth: 3,
        ..ProviderConfig::named("echoing")
    })
    .with_slot(slot)
    .with_subscribers(quiet())
    .with_write_back(move |_t: Tagged| -> FetchRef<()> {
        counted.fetch_add(1, Ordering::SeqCst);
        touched.invalidate();
        ok_write_back()
    })
    .build()
    .unwrap();
    let mut events = provider.events();

    // Publishing notifies the slot listener before the new value is bound.
    provider.retrieve().wait().await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    dirty.fire();
    let suppressed = next_of(&mut events, EventKind::WriteBackSuppressed).await;
    assert_eq!(suppressed.depth, Some(4));
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // A re-publish fires the slot listener again while the old binding is released.
    provider.retrieve().wait().await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(provider.subscription_count(), 1);
}

/// Observable that keeps calling every listener it was ever given, like a notify
/// whose snapshot was taken before the subscription went away.
#[derive(Clone, Default)]
struct Sticky {
    trigger: Trigger,
    kept: Arc<Mutex<Vec<InvalidationListener>>>,
}

impl Sticky {
    fn replay(&self) {
        let kept = self.kept.lock().unwrap().clone();
        for listener in kept {
            listener();
        }
    }
}

impl Observable for Sticky {
    fn add_listener(&self, listener: InvalidationListener) -> Subscription {
        self.kept.lock().unwrap().push(Arc::clone(&listener));
        self.trigger.add_listener(listener)
    }

    fn listener_count(&self) -> usize {
        self.trigger.listener_count()
    }
}

#[derive(Clone)]
struct Held {
    sticky: Sticky,
}

impl Inspect for Held {
    fn inspect(&self, members: &mut Members) {
        members.observe("sticky", &self.sticky);
    }
}

#[tokio::test]
async fn listener_of_a_released_binding_stays_quiet() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let sticky = Sticky::default();
    let served = sticky.clone();

    let provider = DataProvider::builder(FetchFn::new("held", move |_ctx: CancellationToken| {
        let value = Held {
            sticky: served.clone(),
        };
        async move { Ok(value) }
    }))
    .with_subscribers(quiet())
    .with_write_back(move |_h: Held| -> FetchRef<()> {
        counted.fetch_add(1, Ordering::SeqCst);
        ok_write_back()
    })
    .build()
    .unwrap();

    provider.retrieve().wait().await;
    sticky.replay();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // The first listener is still reachable but belongs to a released binding.
    provider.retrieve().wait().await;
    sticky.replay();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    provider.clear_write_back();
    sticky.replay();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn write_back_failure_reaches_sink() {
    let (sink, mut rx) = collector();
    let profile = Profile {
        name: "ada".into(),
        counter: ObservableSlot::new(),
    };
    let served = profile.clone();

    let provider = DataProvider::builder(FetchFn::new("profile", move |_ctx: CancellationToken| {
        let p = served.clone();
        async move { Ok(p) }
    }))
    .with_subscribers(vec![sink])
    .with_write_back(|_: Profile| -> FetchRef<()> {
        FetchFn::arc("save", |_ctx: CancellationToken| async {
            Err(FetchError::fail("disk full"))
        })
    })
    .build()
    .unwrap();

    provider.retrieve().wait().await;
    profile.counter.set(9);

    let ev = collected(&mut rx, EventKind::WriteBackFailed).await;
    assert_eq!(ev.member.as_deref(), Some("counter"));
    assert!(ev.reason.as_deref().unwrap().contains("disk full"));
}

#[tokio::test]
async fn invalidation_with_empty_slot_is_skipped() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let dirty = Trigger::new();
    let served = dirty.clone();

    let provider = DataProvider::builder(FetchFn::new("tagged", move |_ctx: CancellationToken| {
        let value = Tagged {
            n: 1,
            dirty: served.clone(),
        };
        async move { Ok(value) }
    }))
    .with_subscribers(quiet())
    .with_write_back(move |_: Tagged| {
        counted.fetch_add(1, Ordering::SeqCst);
        ok_write_back()
    })
    .build()
    .unwrap();
    let mut events = provider.events();

    provider.retrieve().wait().await;
    provider.slot().clear();
    dirty.fire();

    let skipped = next_of(&mut events, EventKind::WriteBackSkipped).await;
    assert_eq!(skipped.member.as_deref(), Some("dirty"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn clearing_write_back_releases_subscriptions() {
    let dirty = Trigger::new();
    let served = dirty.clone();
    let provider = DataProvider::builder(FetchFn::new("tagged", move |_ctx: CancellationToken| {
        let value = Tagged {
            n: 1,
            dirty: served.clone(),
        };
        async move { Ok(value) }
    }))
    .with_subscribers(quiet())
    .with_write_back(|_: Tagged| ok_write_back())
    .build()
    .unwrap();

    provider.retrieve().wait().await;
    assert_eq!(provider.phase(), Phase::Watching);

    provider.clear_write_back();
    assert_eq!(dirty.listener_count(), 0);
    assert_eq!(provider.phase(), Phase::Published);

    provider.set_write_back(|_: Tagged| ok_write_back());
    provider.retrieve().wait().await;
    assert_eq!(dirty.listener_count(), 1);
}

#[tokio::test]
async fn slot_replacement_after_first_retrieve_is_rejected() {
    let provider = DataProvider::builder(FetchFn::new("n", |_ctx: CancellationToken| async {
        Ok(5u32)
    }))
    .with_subscribers(quiet())
    .build()
    .unwrap();
    let mut events = provider.events();

    let replacement = ObservableSlot::new();
    assert!(provider.set_slot(replacement.clone()));
    provider.retrieve().wait().await;
    assert_eq!(replacement.get(), Some(5));

    assert!(!provider.set_slot(ObservableSlot::new()));
    next_of(&mut events, EventKind::SlotReplaceRejected).await;
    assert!(provider.slot().ptr_eq(&replacement));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slot_replacement_racing_first_retrieve_is_all_or_nothing() {
    for _ in 0..50 {
        let provider = Arc::new(
            DataProvider::builder(FetchFn::new("n", |_ctx: CancellationToken| async {
                Ok(9u32)
            }))
            .with_subscribers(quiet())
            .build()
            .unwrap(),
        );
        let original = provider.slot();
        let replacement = ObservableSlot::new();

        let racer = Arc::clone(&provider);
        let offered = replacement.clone();
        let swap = tokio::task::spawn_blocking(move || racer.set_slot(offered));
        provider.retrieve().wait().await;
        let accepted = swap.await.unwrap();

        if accepted {
            assert!(provider.slot().ptr_eq(&replacement));
            assert_eq!(replacement.get(), Some(9));
            assert_eq!(original.get(), None);
        } else {
            assert!(provider.slot().ptr_eq(&original));
            assert_eq!(original.get(), Some(9));
            assert_eq!(replacement.get(), None);
        }
    }
}

#[tokio::test]
async fn cancelled_fetch_leaves_slot_untouched() {
    let provider = DataProvider::builder(FetchFn::new("hang", |ctx: CancellationToken| async move {
        ctx.cancelled().await;
        Err::<u32, _>(FetchError::Canceled)
    }))
    .with_subscribers(quiet())
    .build()
    .unwrap();
    let mut events = provider.events();

    let handle = provider.retrieve();
    next_of(&mut events, EventKind::FetchStarting).await;
    handle.cancel();

    assert_eq!(handle.wait().await, FetchStatus::Cancelled);
    let ev = next_of(&mut events, EventKind::FetchCancelled).await;
    assert_eq!(ev.fetch, Some(handle.id()));
    assert_eq!(provider.slot().get(), None);
}

#[tokio::test(start_paused = true)]
async fn timed_out_fetch_fails() {
    let provider = DataProvider::builder(FetchFn::new("slow", |_ctx: CancellationToken| async {
        std::future::pending::<()>().await;
        Ok(1u32)
    }))
    .with_config(ProviderConfig {
        timeout: Duration::from_millis(100),
        ..ProviderConfig::default()
    })
    .with_subscribers(quiet())
    .build()
    .unwrap();
    let mut events = provider.events();

    let handle = provider.retrieve();
    assert_eq!(handle.wait().await, FetchStatus::Failed);
    assert_eq!(handle.error().unwrap().as_label(), "fetch_timeout");

    let hit = next_of(&mut events, EventKind::TimeoutHit).await;
    assert_eq!(hit.timeout_ms, Some(100));
    next_of(&mut events, EventKind::FetchFailed).await;
    assert_eq!(provider.slot().get(), None);
}

#[tokio::test]
async fn dropping_provider_cancels_in_flight_fetch() {
    let (read, _gates) = gated(1);
    let provider = DataProvider::builder(read)
        .with_subscribers(quiet())
        .build()
        .unwrap();

    let handle = provider.retrieve();
    tokio::task::yield_now().await;
    drop(provider);

    assert_eq!(
        timeout(WAIT, handle.wait()).await.unwrap(),
        FetchStatus::Cancelled
    );
}

#[tokio::test]
async fn tracking_executor_sees_the_fetch() {
    let (read, mut gates) = gated(1);
    let executor = TrackingExecutor::current().unwrap();
    let provider = DataProvider::builder(read)
        .with_executor(Arc::new(executor.clone()))
        .with_subscribers(quiet())
        .build()
        .unwrap();

    let handle = provider.retrieve();
    let active = executor.active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, handle.id());
    assert_eq!(&*active[0].name, "gated");

    gates.remove(0).send(3).unwrap();
    assert_eq!(handle.result().await.unwrap(), 3);

    let mut watch = executor.watch_active();
    timeout(WAIT, watch.wait_for(|n| *n == 0))
        .await
        .unwrap()
        .unwrap();
}

struct Refuse;

impl Executor for Refuse {
    fn execute(&self, job: Job) -> Result<(), Rejected> {
        Err(Rejected {
            job,
            error: ExecuteError::Rejected {
                reason: "maintenance".into(),
            },
        })
    }

    fn name(&self) -> &'static str {
        "refuse"
    }
}

#[tokio::test]
async fn rejected_job_fails_the_handle() {
    let (sink, mut rx) = collector();
    let provider = DataProvider::builder(FetchFn::new("n", |_ctx: CancellationToken| async {
        Ok(1u32)
    }))
    .with_executor(Arc::new(Refuse))
    .with_subscribers(vec![sink])
    .build()
    .unwrap();

    let handle = provider.retrieve();
    assert_eq!(handle.status(), FetchStatus::Failed);
    assert_eq!(handle.error().unwrap().as_label(), "fetch_rejected");
    assert_eq!(provider.phase(), Phase::Idle);

    let ev = collected(&mut rx, EventKind::FetchFailed).await;
    assert!(ev.reason.as_deref().unwrap().contains("maintenance"));
}
