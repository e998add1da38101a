//! # Example: basic_retrieve
//!
//! Demonstrates the smallest useful provider: one read operation, one slot.
//!
//! Shows how to:
//! - Build a [`DataProvider`] around a [`FetchFn`].
//! - Watch the [`ObservableSlot`] through a `watch` receiver.
//! - Await a [`FetchHandle`](datavisor::FetchHandle) and read failures from it.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► DataProvider::builder(read).build()
//!   ├─► retrieve() ──► RuntimeExecutor ──► read()
//!   │                                        └─► slot.set(value) ──► watcher wakes
//!   └─► retrieve() again (read fails) ──► handle: Failed, slot keeps the old value
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example basic_retrieve
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use datavisor::{DataProvider, FetchError, FetchFn, FetchStatus, ProviderConfig};
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== basic_retrieve example ===\n");

    // 1. A read operation that succeeds once, then fails.
    let calls = Arc::new(AtomicU32::new(0));
    let read = FetchFn::new("temperature", move |_ctx: CancellationToken| {
        let call = calls.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if call == 0 {
                Ok(21.5_f64)
            } else {
                Err(FetchError::fail("sensor offline"))
            }
        }
    });

    // 2. Build the provider (default executor and LogWriter sink).
    let provider = DataProvider::builder(read)
        .with_config(ProviderConfig::named("thermometer"))
        .build()?;

    // 3. Watch the slot like any other part of the program would.
    let mut watcher = provider.slot().watch();
    let watch_task = tokio::spawn(async move {
        while watcher.changed().await.is_ok() {
            println!("[watch] slot now holds {:?}", *watcher.borrow());
        }
    });

    // 4. First fetch succeeds and publishes.
    let first = provider.retrieve();
    println!("[main] first fetch: {:?}", first.wait().await);
    println!("[main] slot: {:?}", provider.slot().get());

    // 5. Second fetch fails; the slot keeps the previous value.
    let second = provider.retrieve();
    if second.wait().await == FetchStatus::Failed {
        println!("[main] second fetch failed: {:?}", second.error());
    }
    println!("[main] slot still: {:?}", provider.slot().get());

    drop(provider);
    watch_task.abort();
    println!("\nfinished");
    Ok(())
}
