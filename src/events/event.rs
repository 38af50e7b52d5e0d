//! # Runtime events emitted by the supervisor and its workers.
//!
//! [`EventKind`] falls into four groups:
//! - **Supervisor events**: phase transitions and per-cluster discovery results
//! - **Worker events**: lifecycle of each worker (starting, handoff, tick, fault, terminal)
//! - **Shutdown events**: shutdown request and how the drain ended
//! - **Subscriber events**: delivery problems inside the subscriber fan-out
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use vaultguard::events::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::WorkerTick)
//!     .with_worker("unseal")
//!     .with_tick(3);
//!
//! assert_eq!(ev.kind, EventKind::WorkerTick);
//! assert_eq!(ev.worker.as_deref(), Some("unseal"));
//! assert_eq!(ev.tick, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::core::Phase;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Supervisor events ===
    /// Supervisor entered a new phase.
    ///
    /// Sets:
    /// - `phase`: the phase entered
    PhaseChanged,

    /// Discovery finished for one cluster query.
    ///
    /// Sets:
    /// - `cluster`: cluster name
    /// - `endpoints`: number of endpoints found
    /// - `reason`: fault summary, when any
    ClusterResolved,

    // === Worker events ===
    /// Worker is starting.
    ///
    /// Sets:
    /// - `worker`: worker name
    WorkerStarting,

    /// Worker received its discovery handoff.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `endpoints`: number of endpoints in the snapshot
    HandoffReceived,

    /// Worker woke up for periodic work.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `tick`: tick number (1-based)
    WorkerTick,

    /// Worker reported a fault and kept running (or is about to stop, if fatal).
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `reason`: error message
    WorkerFault,

    /// Worker finished or observed cancellation.
    ///
    /// Sets:
    /// - `worker`: worker name
    WorkerStopped,

    /// Worker exited with an error or panicked.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `reason`: error message or panic payload
    WorkerFailed,

    // === Shutdown events ===
    /// Drain requested (signal, trigger, or worker failure).
    ///
    /// Sets:
    /// - `reason`: what caused the drain
    ShutdownRequested,

    /// All workers stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some workers did not stop in time.
    GraceExceeded,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `worker`: subscriber name
    /// - `reason`: panic info
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `worker`: subscriber name
    /// - `reason`: `full` or `closed`
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the worker (or subscriber), if applicable.
    pub worker: Option<Arc<str>>,
    /// Spawn ordinal of the worker; tells same-named workers apart.
    pub ordinal: Option<u32>,
    /// Supervisor phase, for `PhaseChanged`.
    pub phase: Option<Phase>,
    /// Cluster name, for `ClusterResolved`.
    pub cluster: Option<Arc<str>>,
    /// Endpoint count.
    pub endpoints: Option<u32>,
    /// Tick number (1-based).
    pub tick: Option<u64>,
    /// Human-readable reason (errors, drain cause, overflow details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            ordinal: None,
            phase: None,
            cluster: None,
            endpoints: None,
            tick: None,
            reason: None,
        }
    }

    /// Attaches a worker name.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches a worker's spawn ordinal.
    #[inline]
    pub fn with_ordinal(mut self, ordinal: u32) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    /// Attaches a phase.
    #[inline]
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attaches a cluster name.
    #[inline]
    pub fn with_cluster(mut self, cluster: impl Into<Arc<str>>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    /// Attaches an endpoint count (saturating).
    #[inline]
    pub fn with_endpoints(mut self, n: usize) -> Self {
        self.endpoints = Some(u32::try_from(n).unwrap_or(u32::MAX));
        self
    }

    /// Attaches a tick number.
    #[inline]
    pub fn with_tick(mut self, n: u64) -> Self {
        self.tick = Some(n);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a phase transition event.
    #[inline]
    pub fn phase_changed(phase: Phase) -> Self {
        Event::new(EventKind::PhaseChanged).with_phase(phase)
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }

    /// True for events emitted by the subscriber fan-out itself.
    #[inline]
    pub fn is_subscriber_internal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::WorkerStarting);
        let b = Event::new(EventKind::WorkerStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn endpoint_count_saturates() {
        let ev = Event::new(EventKind::ClusterResolved).with_endpoints(usize::MAX);
        assert_eq!(ev.endpoints, Some(u32::MAX));
    }
}
