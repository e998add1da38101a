//! # Example: custom_subscriber
//!
//! Demonstrates how to build and attach a custom event sink.
//!
//! Shows how to:
//! - Implement the [`Subscribe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for fetch and write-back outcomes.
//! - Replace the default `LogWriter` through `with_subscribers`.
//!
//! ## Flow
//! ```text
//! retrieve() ──► publish(FetchStarting / FetchSucceeded / FetchFailed / ...)
//!     └─► Bus ──► event listener ──► SubscriberSet.emit() ──► ConsoleSubscriber.on_event()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::sync::Arc;
use std::time::Duration;

use datavisor::{
    DataProvider, Event, EventKind, FetchError, FetchFn, ProviderConfig, Subscribe,
};
use tokio_util::sync::CancellationToken;

/// A simple console subscriber that prints selected events.
/// In real life, you could export metrics, ship logs, or raise alerts.
struct ConsoleSubscriber;

#[async_trait::async_trait]
impl Subscribe for ConsoleSubscriber {
    async fn on_event(&self, ev: &Event) {
        let provider = ev.provider.as_deref().unwrap_or("<unknown>");
        match ev.kind {
            // === Fetch lifecycle ===
            EventKind::FetchStarting => {
                println!("[sub] starting:  provider={provider} fetch={}", ev.fetch.unwrap_or(0));
            }
            EventKind::FetchSucceeded => {
                println!("[sub] succeeded: provider={provider} fetch={}", ev.fetch.unwrap_or(0));
            }
            EventKind::FetchFailed => {
                println!(
                    "[sub] failed:    provider={provider} fetch={} reason={}",
                    ev.fetch.unwrap_or(0),
                    ev.reason.as_deref().unwrap_or("<none>")
                );
            }
            EventKind::TimeoutHit => {
                println!(
                    "[sub] timeout:   provider={provider} timeout={}ms",
                    ev.timeout_ms.unwrap_or(0)
                );
            }
            EventKind::FetchCancelled => {
                println!("[sub] cancelled: provider={provider} fetch={}", ev.fetch.unwrap_or(0));
            }

            // === Write-back ===
            EventKind::WriteBackFailed | EventKind::WriteBackSuppressed => {
                println!(
                    "[sub] write-back trouble: member={} reason={}",
                    ev.member.as_deref().unwrap_or("<unknown>"),
                    ev.reason.as_deref().unwrap_or("<depth limit>")
                );
            }

            // === Ignored ===
            EventKind::SlotReplaceRejected
            | EventKind::DependenciesBound
            | EventKind::MemberSkipped
            | EventKind::SubscriptionsReleased
            | EventKind::WriteBackFired
            | EventKind::WriteBackCompleted
            | EventKind::WriteBackSkipped
            | EventKind::SubscriberPanicked
            | EventKind::SubscriberOverflow => {}
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }

    fn queue_capacity(&self) -> usize {
        256
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("custom_subscriber demo\n");

    let slow = FetchFn::new("slow-quote", |_ctx: CancellationToken| async {
        tokio::time::sleep(Duration::from_millis(400)).await;
        Ok::<_, FetchError>(101.25_f64)
    });

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(ConsoleSubscriber)];
    let provider = DataProvider::builder(slow)
        .with_config(ProviderConfig {
            timeout: Duration::from_millis(200),
            ..ProviderConfig::named("quotes")
        })
        .with_subscribers(subs)
        .build()?;

    // Times out: the sink sees TimeoutHit followed by FetchFailed.
    let handle = provider.retrieve();
    println!("[main] fetch finished as {:?}", handle.wait().await);

    // Dropping the provider drains the bus into the sink before it shuts down.
    drop(provider);
    tokio::time::sleep(Duration::from_millis(50)).await;

    println!("\nfinished");
    Ok(())
}
