//! # Worker abstraction.
//!
//! A [`Worker`] is one long-running unit under supervision: the health
//! endpoint or a lifecycle worker. It runs once; there is no restart.
//!
//! Every worker receives a [`WorkerContext`] carrying:
//! - its child [`CancellationToken`] (cancelled when the supervisor drains),
//! - the event [`Bus`],
//! - the sender half of the supervisor's fault channel.
//!
//! ## Rules
//! - Observe cancellation at every suspension point and return `Ok(())`
//!   (or `Err(WorkerError::Canceled)`) promptly.
//! - Report recoverable failures with [`WorkerContext::report`] and keep going.
//!   A reported `Fatal` fault drains the supervisor like a returned one.
//! - Return `Err(WorkerError::Fatal { .. })` to end the worker; the supervisor
//!   drains everything.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::WorkerError;
use crate::events::{Bus, Event, EventKind};
use crate::workers::WorkerIdentity;

/// Capacity of the supervisor's fault channel.
pub const FAULT_CHANNEL_CAPACITY: usize = 64;

/// A supervised worker.
#[async_trait]
pub trait Worker: Send + 'static {
    /// Name and role.
    fn identity(&self) -> &WorkerIdentity;

    /// Runs until completion, failure, or cancellation.
    async fn run(self: Box<Self>, ctx: WorkerContext) -> Result<(), WorkerError>;
}

/// Boxed worker handed to the supervisor.
pub type BoxWorker = Box<dyn Worker>;

/// A fault reported by a running worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFault {
    /// Reporting worker.
    pub worker: Arc<str>,
    /// What went wrong.
    pub error: WorkerError,
}

/// Per-worker runtime handles.
#[derive(Clone, Debug)]
pub struct WorkerContext {
    identity: WorkerIdentity,
    token: CancellationToken,
    bus: Bus,
    faults: mpsc::Sender<WorkerFault>,
}

impl WorkerContext {
    /// Creates a context for the worker `identity`.
    pub fn new(
        identity: WorkerIdentity,
        token: CancellationToken,
        bus: Bus,
        faults: mpsc::Sender<WorkerFault>,
    ) -> Self {
        Self {
            identity,
            token,
            bus,
            faults,
        }
    }

    /// Identity of the owning worker, ordinal included.
    pub fn worker(&self) -> &WorkerIdentity {
        &self.identity
    }

    /// Cancellation token of this worker.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Completes once the worker is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Publishes an event tagged with this worker's name and ordinal.
    pub fn publish(&self, ev: Event) {
        self.bus.publish(
            ev.with_worker(self.identity.name_arc())
                .with_ordinal(self.identity.ordinal()),
        );
    }

    /// Reports a fault on the supervisor's fault channel.
    ///
    /// A recoverable fault never waits: with the channel full it is logged and
    /// dropped. A fatal fault waits for room until the worker is cancelled.
    pub async fn report(&self, error: WorkerError) {
        self.publish(Event::new(EventKind::WorkerFault).with_reason(error.to_string()));
        let fatal = error.is_fatal();
        let fault = WorkerFault {
            worker: self.identity.name_arc(),
            error,
        };

        if !fatal {
            if let Err(e) = self.faults.try_send(fault) {
                warn!(worker = %self.identity, error = %e, "fault channel unavailable; fault dropped");
            }
            return;
        }
        tokio::select! {
            biased;
            sent = self.faults.send(fault) => {
                if sent.is_err() {
                    warn!(worker = %self.identity, "fault channel closed; fatal fault dropped");
                }
            }
            _ = self.token.cancelled() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::Role;
    use std::time::Duration;

    fn context(capacity: usize) -> (WorkerContext, mpsc::Receiver<WorkerFault>) {
        let (tx, rx) = mpsc::channel(capacity);
        let identity = WorkerIdentity::of(Role::Unseal).with_ordinal(3);
        let ctx = WorkerContext::new(identity, CancellationToken::new(), Bus::default(), tx);
        (ctx, rx)
    }

    fn fail(msg: &str) -> WorkerError {
        WorkerError::Fail { error: msg.into() }
    }

    #[tokio::test]
    async fn published_events_carry_name_and_ordinal() {
        let (ctx, _rx) = context(1);
        let mut events = ctx.bus.subscribe();

        ctx.publish(Event::new(EventKind::WorkerTick));
        let ev = events.try_recv().unwrap();
        assert_eq!(ev.worker.as_deref(), Some("unseal"));
        assert_eq!(ev.ordinal, Some(3));
    }

    #[tokio::test]
    async fn fatal_fault_waits_for_a_full_channel() {
        let (ctx, mut rx) = context(1);
        ctx.report(fail("sealed")).await;
        // Channel full: a second recoverable fault is dropped without waiting.
        ctx.report(fail("still sealed")).await;

        let reporter = ctx.clone();
        let fatal = tokio::spawn(async move {
            reporter
                .report(WorkerError::Fatal {
                    error: "bad key".into(),
                })
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!fatal.is_finished());

        assert_eq!(rx.recv().await.unwrap().error, fail("sealed"));
        let second = rx.recv().await.unwrap();
        assert!(second.error.is_fatal());
        assert_eq!(&*second.worker, "unseal");
        fatal.await.unwrap();
    }

    #[tokio::test]
    async fn fatal_fault_gives_up_once_cancelled() {
        let (ctx, _rx) = context(1);
        ctx.report(fail("sealed")).await;
        ctx.token().cancel();

        tokio::time::timeout(
            Duration::from_secs(1),
            ctx.report(WorkerError::Fatal {
                error: "bad key".into(),
            }),
        )
        .await
        .unwrap();
    }
}
