//! # Run a single fetch.
//!
//! Executes one [`Fetch`] with cancellation, an optional timeout and panic capture.
//! Terminal events are left to the caller (reads and write-backs report differently);
//! only `TimeoutHit` is published here.
//!
//! ## Outcome mapping
//! ```text
//! fetch future → Ok(v)                     → Ok(v)
//!              → Err(e)                    → Err(e)
//!              → panic (create or poll)    → Err(Panicked)
//! token cancelled first                    → cancel child → Err(Canceled)
//! timeout exceeded                         → cancel child → publish TimeoutHit → Err(Timeout)
//! ```
//!
//! ## Rules
//! - Cancellation wins over a result that becomes ready in the same poll.
//! - Every fetch gets a **child token**; cancelling it does not affect the parent.
//! - A fetch that ignores its token is abandoned, not interrupted.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use futures::FutureExt;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use super::emitter::Emitter;
use crate::error::{FetchError, panic_message};
use crate::events::EventKind;
use crate::fetch::Fetch;

/// Runs `fetch` once under `parent`, reporting timeouts through `emit`.
pub(crate) async fn run_once<T>(
    fetch: &dyn Fetch<T>,
    parent: &CancellationToken,
    timeout: Option<Duration>,
    emit: &Emitter,
    id: u64,
) -> Result<T, FetchError>
where
    T: Send + 'static,
{
    let child = parent.child_token();

    let fut = match catch_unwind(AssertUnwindSafe(|| fetch.fetch(child.clone()))) {
        Ok(fut) => fut,
        Err(payload) => {
            return Err(FetchError::Panicked {
                info: panic_message(payload.as_ref()),
            });
        }
    };
    let guarded = AssertUnwindSafe(fut).catch_unwind().map(|res| match res {
        Ok(res) => res,
        Err(payload) => Err(FetchError::Panicked {
            info: panic_message(payload.as_ref()),
        }),
    });

    let work = async {
        match timeout.filter(|d| *d > Duration::ZERO) {
            Some(dur) => match time::timeout(dur, guarded).await {
                Ok(res) => res,
                Err(_elapsed) => {
                    child.cancel();
                    emit.publish(
                        emit.event(EventKind::TimeoutHit)
                            .with_fetch(id)
                            .with_timeout(dur),
                    );
                    Err(FetchError::Timeout { timeout: dur })
                }
            },
            None => guarded.await,
        }
    };

    select! {
        biased;
        _ = parent.cancelled() => {
            child.cancel();
            Err(FetchError::Canceled)
        }
        res = work => res,
    }
}
