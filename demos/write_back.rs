//! # Example: write_back
//!
//! Demonstrates the write-back loop: changing a member of the published value
//! writes the whole value back.
//!
//! Shows how to:
//! - Expose observable members through [`Inspect`].
//! - Install a [`WriteBack`](datavisor::WriteBack) handler with `with_write_back`.
//! - Use a [`Trigger`] as a value-less "dirty" flag.
//! - Bound self-triggering write-backs with `max_write_back_depth`.
//!
//! ## Flow
//! ```text
//! retrieve() ──► publish(Document) ──► scan ──► listeners on `title`, `dirty`
//!
//! doc.title.set(..) ─┐
//! doc.dirty.fire() ──┴─► handler(current Document) ──► save op ──► executor
//!                                                           └─► WriteBackCompleted
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example write_back
//! ```

use std::time::Duration;

use datavisor::{
    DataProvider, EventKind, FetchError, FetchFn, FetchRef, Inspect, Members, ObservableSlot,
    ProviderConfig, Trigger,
};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
struct Document {
    id: u32,
    title: ObservableSlot<String>,
    dirty: Trigger,
}

impl Inspect for Document {
    fn inspect(&self, members: &mut Members) {
        members
            .observe("title", &self.title)
            .observe("dirty", &self.dirty);
    }
}

/// Builds the operation that persists `doc`.
fn save(doc: Document) -> FetchRef<()> {
    FetchFn::arc("save-document", move |ctx: CancellationToken| {
        let id = doc.id;
        let title = doc.title.get().unwrap_or_default();
        async move {
            tokio::select! {
                _ = ctx.cancelled() => return Err(FetchError::Canceled),
                _ = tokio::time::sleep(Duration::from_millis(50)) => {}
            }
            println!("[save] document {id} saved with title {title:?}");
            Ok::<_, FetchError>(())
        }
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== write_back example ===\n");

    let load = FetchFn::new("load-document", |_ctx: CancellationToken| async {
        Ok::<_, FetchError>(Document {
            id: 7,
            title: ObservableSlot::with_value("draft".to_string()),
            dirty: Trigger::new(),
        })
    });

    let provider = DataProvider::builder(load)
        .with_config(ProviderConfig {
            max_write_back_depth: 4,
            ..ProviderConfig::named("documents")
        })
        .with_write_back(save)
        .build()?;
    let mut events = provider.events();

    provider.retrieve().result().await?;
    println!("[main] bound {} members", provider.subscription_count());

    if let Some(doc) = provider.slot().get() {
        // Each invalidation writes back once, using the value in the slot right now.
        doc.title.set("final".to_string());
        doc.dirty.fire();
    }

    let mut completed = 0;
    while completed < 2 {
        let ev = events.recv().await?;
        if ev.kind == EventKind::WriteBackCompleted {
            completed += 1;
            println!(
                "[main] write-back {} for member {:?} completed",
                ev.fetch.unwrap_or(0),
                ev.member.as_deref().unwrap_or("<unknown>")
            );
        }
    }

    println!("\nfinished");
    Ok(())
}
