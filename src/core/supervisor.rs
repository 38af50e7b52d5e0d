//! # Supervisor: discovery, worker startup, handoff, and bounded shutdown.
//!
//! ```text
//! Idle
//!  └─► Discovering   Resolver::resolve(queries)            (blocking, no timeout)
//!       └─► Running  spawn health + init/unseal + extra workers (child tokens, JoinSet)
//!            │        deliver Arc<[DiscoveryResult]> to every lifecycle worker (once)
//!            │        select! { biased;
//!            │            trigger (signal / caller)      → drain
//!            │            fault channel: fatal           → drain
//!            │                           fail            → log, continue
//!            │            join_next: error / panic       → drain
//!            │                       clean exit          → continue
//!            │                       none left           → drain }
//!            └─► Draining  ShutdownRequested, runtime token cancelled,
//!                 wait_all_with_grace(grace):
//!                   ├─ all joined → AllStoppedWithin
//!                   └─ timeout    → GraceExceeded (AliveTracker snapshot names the stuck workers)
//!                 └─► Stopped
//! ```
//!
//! ## Rules
//! - Each phase is entered once, in order; a supervisor runs once.
//! - No worker starts before discovery has finished.
//! - Workers are numbered in spawn order from 1; the ordinal tags their events,
//!   so same-named workers are tracked apart.
//! - The signal listener is installed only once workers are running.
//! - Drain latency is bounded by `max(tick_interval, health_shutdown)` for the
//!   built-in workers and by `grace` overall.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::core::runner::{self, ExitStatus, WorkerExit};
use crate::core::{Phase, alive::AliveTracker, shutdown};
use crate::discovery::{ClusterQuery, DiscoveryResult, Resolver};
use crate::error::{RuntimeError, WorkerError};
use crate::events::{Bus, Event, EventKind};
use crate::health::HealthServer;
use crate::subscribers::SubscriberSet;
use crate::workers::{
    BoxWorker, DiscoverySnapshot, FAULT_CHANNEL_CAPACITY, HandoffSender, LifecycleWorker,
    VaultControl, WorkerContext, WorkerFault, handoff,
};

/// Why the supervisor left the running phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainReason {
    /// A termination signal arrived.
    Signal(&'static str),
    /// The caller's trigger completed.
    Requested,
    /// Signal listeners could not be installed.
    SignalUnavailable(String),
    /// A worker reported a fatal fault or exited with an error.
    WorkerFailed {
        /// Worker name.
        worker: Arc<str>,
        /// The error.
        error: WorkerError,
    },
    /// A worker panicked.
    WorkerPanicked {
        /// Worker name.
        worker: Arc<str>,
        /// Panic payload.
        info: String,
    },
    /// Every worker exited on its own.
    AllWorkersExited,
}

impl fmt::Display for DrainReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrainReason::Signal(name) => write!(f, "received {name}"),
            DrainReason::Requested => f.write_str("shutdown requested"),
            DrainReason::SignalUnavailable(e) => write!(f, "signal listener unavailable: {e}"),
            DrainReason::WorkerFailed { worker, error } => write!(f, "worker {worker} failed: {error}"),
            DrainReason::WorkerPanicked { worker, info } => {
                write!(f, "worker {worker} panicked: {info}")
            }
            DrainReason::AllWorkersExited => f.write_str("all workers exited"),
        }
    }
}

/// Coordinates discovery, the workers, and graceful shutdown.
pub struct Supervisor {
    config: Config,
    queries: Vec<ClusterQuery>,
    resolver: Resolver,
    control: Arc<dyn VaultControl>,
    extra_workers: Mutex<Vec<BoxWorker>>,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    alive: Arc<AliveTracker>,
    phase: watch::Sender<Phase>,
}

impl Supervisor {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new_internal(
        config: Config,
        queries: Vec<ClusterQuery>,
        resolver: Resolver,
        control: Arc<dyn VaultControl>,
        extra_workers: Vec<BoxWorker>,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        alive: Arc<AliveTracker>,
    ) -> Self {
        Self {
            config,
            queries,
            resolver,
            control,
            extra_workers: Mutex::new(extra_workers),
            bus,
            subs,
            alive,
            phase: watch::channel(Phase::Idle).0,
        }
    }

    /// Event bus shared with every worker.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Receiver observing phase transitions.
    pub fn watch_phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Runs until a termination signal (or a worker failure), then drains.
    pub async fn run(&self) -> Result<DrainReason, RuntimeError> {
        self.drive(async {
            match shutdown::wait_for_shutdown_signal().await {
                Ok(signal) => DrainReason::Signal(signal),
                Err(e) => {
                    error!(error = %e, "unable to install signal listeners");
                    DrainReason::SignalUnavailable(e.to_string())
                }
            }
        })
        .await
    }

    /// Runs until `trigger` completes (or a worker failure), then drains.
    pub async fn run_until<F>(&self, trigger: F) -> Result<DrainReason, RuntimeError>
    where
        F: Future<Output = ()> + Send,
    {
        self.drive(async {
            trigger.await;
            DrainReason::Requested
        })
        .await
    }

    async fn drive<F>(&self, trigger: F) -> Result<DrainReason, RuntimeError>
    where
        F: Future<Output = DrainReason> + Send,
    {
        if !self.enter(Phase::Discovering) {
            return Err(RuntimeError::AlreadyStarted);
        }
        let _listener = self.subscriber_listener();
        let snapshot: DiscoverySnapshot = self.discover().await.into();

        let token = CancellationToken::new();
        let (fault_tx, mut fault_rx) = mpsc::channel(FAULT_CHANNEL_CAPACITY);
        let mut set = JoinSet::new();

        self.enter(Phase::Running);
        let handoffs = self.spawn_workers(&mut set, &token, &fault_tx);
        drop(fault_tx);
        for (worker, sender) in handoffs {
            if !sender.deliver(Arc::clone(&snapshot)) {
                warn!(worker, "worker gone before discovery handoff");
            }
        }

        let reason = self.watch(&mut set, &mut fault_rx, trigger).await;

        self.enter(Phase::Draining);
        info!(%reason, "draining");
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(reason.to_string()));
        token.cancel();
        let drained = self.wait_all_with_grace(&mut set).await;

        self.enter(Phase::Stopped);
        drained.map(|()| reason)
    }

    /// Moves to `next` if it directly follows the current phase.
    fn enter(&self, next: Phase) -> bool {
        let moved = self.phase.send_if_modified(|phase| {
            if phase.precedes(next) {
                *phase = next;
                true
            } else {
                false
            }
        });
        if moved {
            info!(phase = %next, "supervisor phase");
            self.bus.publish(Event::phase_changed(next));
        }
        moved
    }

    /// Forwards bus events to the alive tracker and the subscriber set.
    fn subscriber_listener(&self) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let alive = Arc::clone(&self.alive);
        let subs = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        alive.update(&ev).await;
                        subs.emit(&ev);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    async fn discover(&self) -> Vec<DiscoveryResult> {
        let results = self.resolver.resolve(&self.queries).await;
        for result in &results {
            info!(
                cluster = %result.cluster_name,
                endpoints = ?result.urls(),
                faults = result.faults.len(),
                "discovered vault servers"
            );
            let mut ev = Event::new(EventKind::ClusterResolved)
                .with_cluster(result.cluster_name.as_str())
                .with_endpoints(result.endpoints.len());
            if !result.faults.is_empty() {
                let summary: Vec<String> = result.faults.iter().map(|f| f.to_string()).collect();
                ev = ev.with_reason(summary.join("; "));
            }
            self.bus.publish(ev);
        }
        results
    }

    /// Spawns every worker and returns the handoff senders of the lifecycle workers.
    ///
    /// Ordinals are assigned in spawn order, starting at 1.
    fn spawn_workers(
        &self,
        set: &mut JoinSet<WorkerExit>,
        token: &CancellationToken,
        faults: &mpsc::Sender<WorkerFault>,
    ) -> Vec<(&'static str, HandoffSender<DiscoverySnapshot>)> {
        let guard = &self.config.app.guard;
        let mut spawner = Spawner {
            set,
            token,
            faults,
            bus: &self.bus,
            next_ordinal: 1,
        };

        let (address, port) = self.config.listen_addr();
        let health = HealthServer::new(address, port, guard.timings.health_shutdown());
        spawner.spawn(Box::new(health));

        let tick = guard.timings.tick_interval();
        let mut handoffs = Vec::new();
        if guard.init {
            let (tx, rx) = handoff::channel();
            let worker = LifecycleWorker::init(tick, Arc::clone(&self.control), rx);
            spawner.spawn(Box::new(worker));
            handoffs.push(("init", tx));
        }
        if guard.unseal {
            let (tx, rx) = handoff::channel();
            let worker = LifecycleWorker::unseal(tick, Arc::clone(&self.control), rx);
            spawner.spawn(Box::new(worker));
            handoffs.push(("unseal", tx));
        }
        if handoffs.is_empty() {
            info!("init and unseal disabled; only the health endpoint runs");
        }

        let extra = match self.extra_workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for worker in extra {
            spawner.spawn(worker);
        }
        handoffs
    }

    /// Waits for the first reason to drain.
    async fn watch<F>(
        &self,
        set: &mut JoinSet<WorkerExit>,
        faults: &mut mpsc::Receiver<WorkerFault>,
        trigger: F,
    ) -> DrainReason
    where
        F: Future<Output = DrainReason> + Send,
    {
        let mut trigger = std::pin::pin!(trigger);
        loop {
            tokio::select! {
                biased;
                reason = &mut trigger => return reason,
                Some(fault) = faults.recv() => {
                    if fault.error.is_fatal() {
                        return DrainReason::WorkerFailed {
                            worker: fault.worker,
                            error: fault.error,
                        };
                    }
                    warn!(
                        worker = %fault.worker,
                        error = %fault.error,
                        label = fault.error.as_label(),
                        "worker fault"
                    );
                }
                joined = set.join_next() => match joined {
                    None => return DrainReason::AllWorkersExited,
                    Some(Ok(WorkerExit { worker, status })) => match status {
                        ExitStatus::Completed | ExitStatus::Canceled => {
                            info!(worker = %worker, "worker finished");
                        }
                        ExitStatus::Failed(error) => {
                            return DrainReason::WorkerFailed { worker, error };
                        }
                        ExitStatus::Panicked(info) => {
                            return DrainReason::WorkerPanicked { worker, info };
                        }
                    },
                    Some(Err(e)) => {
                        return DrainReason::WorkerPanicked {
                            worker: Arc::from("unknown"),
                            info: e.to_string(),
                        };
                    }
                },
            }
        }
    }

    /// Waits for every worker within the grace period.
    async fn wait_all_with_grace(&self, set: &mut JoinSet<WorkerExit>) -> Result<(), RuntimeError> {
        let grace: Duration = self.config.app.guard.timings.grace();
        let done = async {
            while let Some(joined) = set.join_next().await {
                if let Ok(WorkerExit { worker, status }) = joined {
                    debug!(worker = %worker, ?status, "worker drained");
                }
            }
        };

        match tokio::time::timeout(grace, done).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                self.bus.publish(Event::new(EventKind::GraceExceeded));
                let stuck = self.alive.snapshot().await;
                set.abort_all();
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}

/// Spawns workers into the join set, numbering them as it goes.
struct Spawner<'a> {
    set: &'a mut JoinSet<WorkerExit>,
    token: &'a CancellationToken,
    faults: &'a mpsc::Sender<WorkerFault>,
    bus: &'a Bus,
    next_ordinal: u32,
}

impl Spawner<'_> {
    fn spawn(&mut self, worker: BoxWorker) {
        let identity = worker.identity().clone().with_ordinal(self.next_ordinal);
        self.next_ordinal += 1;
        debug!(worker = %identity, "spawning worker");

        let ctx = WorkerContext::new(
            identity,
            self.token.child_token(),
            self.bus.clone(),
            self.faults.clone(),
        );
        self.set.spawn(runner::run_worker(worker, ctx));
    }
}
