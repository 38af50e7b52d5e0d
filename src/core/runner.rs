//! # Runs one worker to completion.
//!
//! ```text
//! publish WorkerStarting
//!   └─► worker.run(ctx)  (panics caught)
//!         ├─ Ok(()) / Err(Canceled) ─► publish WorkerStopped  ─► Completed / Canceled
//!         ├─ Err(e)                 ─► publish WorkerFailed   ─► Failed(e)
//!         └─ panic                  ─► publish WorkerFailed   ─► Panicked(info)
//! ```
//!
//! ## Rules
//! - Exactly one terminal event per worker: `WorkerStopped` or `WorkerFailed`.
//! - `Canceled` is a graceful exit, not a failure.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::error::WorkerError;
use crate::events::{Event, EventKind};
use crate::subscribers::panic_message;
use crate::workers::{BoxWorker, WorkerContext};

/// How a worker ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ExitStatus {
    Completed,
    Canceled,
    Failed(WorkerError),
    Panicked(String),
}

/// A finished worker, as collected from the supervisor's join set.
#[derive(Debug, Clone)]
pub(crate) struct WorkerExit {
    pub worker: Arc<str>,
    pub status: ExitStatus,
}

/// Runs `worker` with `ctx`, publishing its lifecycle events.
pub(crate) async fn run_worker(worker: BoxWorker, ctx: WorkerContext) -> WorkerExit {
    let name = ctx.worker().name_arc();
    ctx.publish(Event::new(EventKind::WorkerStarting));

    let status = match AssertUnwindSafe(worker.run(ctx.clone())).catch_unwind().await {
        Ok(Ok(())) => ExitStatus::Completed,
        Ok(Err(WorkerError::Canceled)) => ExitStatus::Canceled,
        Ok(Err(e)) => ExitStatus::Failed(e),
        Err(panic) => ExitStatus::Panicked(panic_message(panic.as_ref())),
    };

    match &status {
        ExitStatus::Completed | ExitStatus::Canceled => {
            ctx.publish(Event::new(EventKind::WorkerStopped));
        }
        ExitStatus::Failed(e) => {
            ctx.publish(Event::new(EventKind::WorkerFailed).with_reason(e.to_string()));
        }
        ExitStatus::Panicked(info) => {
            ctx.publish(Event::new(EventKind::WorkerFailed).with_reason(format!("panicked: {info}")));
        }
    }

    WorkerExit {
        worker: name,
        status,
    }
}
