//! # Lifecycle workers.
//!
//! A [`LifecycleWorker`] initializes or unseals every discovered vault server
//! on a fixed tick.
//!
//! ```text
//! receive(handoff) ──► HandoffReceived ──► loop {
//!     select! { cancelled => return Ok(()),
//!               tick      => WorkerTick, control(endpoint) for each endpoint }
//! }
//! ```
//!
//! ## Rules
//! - Nothing happens before the handoff is received.
//! - The first tick fires one full interval after the handoff.
//! - Cancellation is observed while waiting for a tick and between endpoints,
//!   so a drain completes within one tick interval.
//! - `Fail` from the control client is reported and the loop continues;
//!   `Fatal` ends the worker.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::discovery::VaultEndpoint;
use crate::error::WorkerError;
use crate::events::{Event, EventKind};
use crate::workers::handoff::HandoffReceiver;
use crate::workers::{DiscoverySnapshot, Role, VaultControl, Worker, WorkerContext, WorkerIdentity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Initialize,
    Unseal,
}

impl Action {
    async fn apply(
        self,
        control: &dyn VaultControl,
        endpoint: &VaultEndpoint,
    ) -> Result<(), WorkerError> {
        match self {
            Action::Initialize => control.initialize(endpoint).await,
            Action::Unseal => control.unseal(endpoint).await,
        }
    }
}

/// Shortest tick a worker runs with; shorter ticks are raised to it.
pub const MIN_TICK: Duration = Duration::from_millis(1);

/// Periodic initialize/unseal worker.
pub struct LifecycleWorker {
    identity: WorkerIdentity,
    action: Action,
    tick: Duration,
    control: Arc<dyn VaultControl>,
    handoff: HandoffReceiver<DiscoverySnapshot>,
}

impl LifecycleWorker {
    /// Worker that initializes vault servers.
    pub fn init(
        tick: Duration,
        control: Arc<dyn VaultControl>,
        handoff: HandoffReceiver<DiscoverySnapshot>,
    ) -> Self {
        Self::new(Role::Init, Action::Initialize, tick, control, handoff)
    }

    /// Worker that unseals vault servers.
    pub fn unseal(
        tick: Duration,
        control: Arc<dyn VaultControl>,
        handoff: HandoffReceiver<DiscoverySnapshot>,
    ) -> Self {
        Self::new(Role::Unseal, Action::Unseal, tick, control, handoff)
    }

    fn new(
        role: Role,
        action: Action,
        tick: Duration,
        control: Arc<dyn VaultControl>,
        handoff: HandoffReceiver<DiscoverySnapshot>,
    ) -> Self {
        Self {
            identity: WorkerIdentity::of(role),
            action,
            tick: tick.max(MIN_TICK),
            control,
            handoff,
        }
    }
}

#[async_trait]
impl Worker for LifecycleWorker {
    fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    async fn run(self: Box<Self>, ctx: WorkerContext) -> Result<(), WorkerError> {
        let LifecycleWorker {
            action,
            tick,
            control,
            handoff,
            ..
        } = *self;

        let snapshot = handoff.receive(ctx.token()).await?;
        let endpoints = endpoints_of(&snapshot);
        ctx.publish(Event::new(EventKind::HandoffReceived).with_endpoints(endpoints.len()));

        let mut ticker = time::interval_at(Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut n = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => return Ok(()),
                _ = ticker.tick() => {}
            }
            n += 1;
            ctx.publish(Event::new(EventKind::WorkerTick).with_tick(n));

            for endpoint in &endpoints {
                let outcome = tokio::select! {
                    biased;
                    _ = ctx.cancelled() => return Ok(()),
                    r = action.apply(control.as_ref(), endpoint) => r,
                };
                match outcome {
                    Ok(()) => {}
                    Err(WorkerError::Canceled) => return Ok(()),
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => ctx.report(e).await,
                }
            }
        }
    }
}

/// Every endpoint in the snapshot, de-duplicated and ordered.
fn endpoints_of(snapshot: &DiscoverySnapshot) -> Vec<VaultEndpoint> {
    snapshot
        .iter()
        .flat_map(|r| r.endpoints.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::DiscoveryResult;
    use crate::events::Bus;
    use crate::workers::{WorkerFault, handoff};
    use std::sync::Mutex;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(&'static str, String)>>,
        script: Mutex<Vec<Result<(), WorkerError>>>,
    }

    impl Recording {
        fn scripted(script: Vec<Result<(), WorkerError>>) -> Self {
            Self {
                calls: Mutex::default(),
                script: Mutex::new(script.into_iter().rev().collect()),
            }
        }

        fn calls(&self) -> Vec<(&'static str, String)> {
            self.calls.lock().unwrap().clone()
        }

        fn next(&self, op: &'static str, endpoint: &VaultEndpoint) -> Result<(), WorkerError> {
            self.calls.lock().unwrap().push((op, endpoint.url()));
            self.script.lock().unwrap().pop().unwrap_or(Ok(()))
        }
    }

    #[async_trait]
    impl VaultControl for Recording {
        async fn initialize(&self, endpoint: &VaultEndpoint) -> Result<(), WorkerError> {
            self.next("initialize", endpoint)
        }
        async fn unseal(&self, endpoint: &VaultEndpoint) -> Result<(), WorkerError> {
            self.next("unseal", endpoint)
        }
    }

    fn snapshot() -> DiscoverySnapshot {
        let mut a = DiscoveryResult::empty("a");
        a.endpoints = vec![VaultEndpoint {
            ip: "10.0.0.1".into(),
            port: 8200,
        }];
        let b = a.clone();
        Arc::from(vec![a, b])
    }

    fn context(role: Role) -> (WorkerContext, mpsc::Receiver<WorkerFault>) {
        let (tx, rx) = mpsc::channel(8);
        let identity = WorkerIdentity::of(role).with_ordinal(1);
        let ctx = WorkerContext::new(identity, CancellationToken::new(), Bus::default(), tx);
        (ctx, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn no_work_before_handoff() {
        let control = Arc::new(Recording::default());
        let (tx, rx) = handoff::channel();
        let worker = LifecycleWorker::unseal(Duration::from_millis(50), control.clone(), rx);
        let (ctx, _faults) = context(Role::Unseal);
        let token = ctx.token().clone();
        let handle = tokio::spawn(Box::new(worker).run(ctx));

        time::sleep(Duration::from_millis(500)).await;
        assert!(control.calls().is_empty());

        assert!(tx.deliver(snapshot()));
        time::sleep(Duration::from_millis(60)).await;
        assert_eq!(
            control.calls(),
            vec![("unseal", "https://10.0.0.1:8200".to_owned())]
        );

        token.cancel();
        assert_eq!(handle.await.unwrap(), Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn fail_is_reported_and_fatal_ends_the_worker() {
        let control = Arc::new(Recording::scripted(vec![
            Err(WorkerError::Fail {
                error: "sealed".into(),
            }),
            Err(WorkerError::Fatal {
                error: "bad key".into(),
            }),
        ]));
        let (tx, rx) = handoff::channel();
        let worker = LifecycleWorker::init(Duration::from_millis(50), control.clone(), rx);
        let (ctx, mut faults) = context(Role::Init);
        assert!(tx.deliver(snapshot()));

        let res = Box::new(worker).run(ctx).await;
        assert_eq!(
            res,
            Err(WorkerError::Fatal {
                error: "bad key".into()
            })
        );
        assert_eq!(control.calls().len(), 2);

        let fault = faults.recv().await.unwrap();
        assert_eq!(&*fault.worker, "init");
        assert_eq!(fault.error.as_label(), "worker_failed");
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_before_handoff_is_a_clean_stop() {
        let (_tx, rx) = handoff::channel();
        let worker =
            LifecycleWorker::init(Duration::from_secs(5), Arc::new(Recording::default()), rx);
        let (ctx, _faults) = context(Role::Init);
        ctx.token().cancel();
        assert_eq!(Box::new(worker).run(ctx).await, Err(WorkerError::Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_tick_is_raised_to_the_minimum() {
        let control = Arc::new(Recording::default());
        let (tx, rx) = handoff::channel();
        let worker = LifecycleWorker::unseal(Duration::ZERO, control.clone(), rx);
        assert_eq!(worker.tick, MIN_TICK);

        let (ctx, _faults) = context(Role::Unseal);
        let token = ctx.token().clone();
        assert!(tx.deliver(snapshot()));
        let handle = tokio::spawn(Box::new(worker).run(ctx));

        time::sleep(Duration::from_millis(5)).await;
        assert!(!control.calls().is_empty());

        token.cancel();
        assert_eq!(handle.await.unwrap(), Ok(()));
    }
}
