//! # LogWriter: renders runtime events through `tracing`.
//!
//! ## Example output
//! ```text
//! INFO  phase changed phase=running
//! INFO  cluster resolved cluster="vault" endpoints=3
//! DEBUG worker tick worker="unseal" tick=4
//! WARN  worker fault worker="init" reason="work failed: connection refused"
//! WARN  grace period exceeded
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Constructs a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::PhaseChanged => {
                if let Some(phase) = e.phase {
                    info!(%phase, "phase changed");
                }
            }
            EventKind::ClusterResolved => info!(
                cluster = e.cluster.as_deref().unwrap_or("-"),
                endpoints = e.endpoints.unwrap_or(0),
                reason,
                "cluster resolved"
            ),
            EventKind::WorkerStarting => {
                info!(worker, ordinal = e.ordinal.unwrap_or(0), "worker starting")
            }
            EventKind::HandoffReceived => info!(
                worker,
                endpoints = e.endpoints.unwrap_or(0),
                "discovery handoff received"
            ),
            EventKind::WorkerTick => debug!(worker, tick = e.tick.unwrap_or(0), "worker tick"),
            EventKind::WorkerFault => warn!(worker, reason, "worker fault"),
            EventKind::WorkerStopped => info!(worker, "worker stopped"),
            EventKind::WorkerFailed => error!(worker, reason, "worker failed"),
            EventKind::ShutdownRequested => info!(reason, "shutdown requested"),
            EventKind::AllStoppedWithin => info!("all workers stopped within grace"),
            EventKind::GraceExceeded => warn!("grace period exceeded"),
            EventKind::SubscriberOverflow => {
                warn!(subscriber = worker, reason, "subscriber overflow")
            }
            EventKind::SubscriberPanicked => {
                warn!(subscriber = worker, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
