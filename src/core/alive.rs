//! # Worker liveness tracker with sequence-based ordering.
//!
//! Keeps which workers are currently running, using event sequence numbers to
//! tolerate out-of-order delivery. The supervisor reads it when the grace
//! period runs out to name the stuck workers.
//!
//! ## Rules
//! - Workers are keyed by `(name, ordinal)`; same-named workers stay apart.
//! - Only `WorkerStarting` / `WorkerStopped` / `WorkerFailed` change liveness.
//! - Other worker events advance `last_seq` only.
//! - Events with `seq <= last_seq` are rejected as stale.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};

#[derive(Debug, Clone, Copy, Default)]
struct WorkerState {
    last_seq: Option<u64>,
    alive: bool,
}

/// Thread-safe tracker of running workers.
#[derive(Debug, Default)]
pub struct AliveTracker {
    state: RwLock<HashMap<(Arc<str>, u32), WorkerState>>,
}

impl AliveTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `ev` if it is newer than the last event seen for its worker.
    ///
    /// Returns `true` when liveness changed state.
    pub async fn update(&self, ev: &Event) -> bool {
        if ev.is_subscriber_internal() {
            return false;
        }
        let Some(name) = ev.worker.as_ref() else {
            return false;
        };
        let key = (Arc::clone(name), ev.ordinal.unwrap_or(0));

        let mut state = self.state.write().await;
        let entry = state.entry(key).or_default();
        if entry.last_seq.is_some_and(|last| ev.seq <= last) {
            return false;
        }
        entry.last_seq = Some(ev.seq);

        let alive = match ev.kind {
            EventKind::WorkerStarting => true,
            EventKind::WorkerStopped | EventKind::WorkerFailed => false,
            _ => return false,
        };
        let changed = entry.alive != alive;
        entry.alive = alive;
        changed
    }

    /// Sorted names of workers currently running, one entry per worker.
    pub async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut alive: Vec<(&Arc<str>, u32)> = state
            .iter()
            .filter(|(_, s)| s.alive)
            .map(|((name, ordinal), _)| (name, *ordinal))
            .collect();
        alive.sort_unstable();
        alive.into_iter().map(|(name, _)| name.to_string()).collect()
    }

    /// Whether any worker with this name is running.
    pub async fn is_alive(&self, name: &str) -> bool {
        self.state
            .read()
            .await
            .iter()
            .any(|((n, _), s)| &**n == name && s.alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stale_events_are_rejected() {
        let tracker = AliveTracker::new();
        let start = Event::new(EventKind::WorkerStarting).with_worker("init");
        let stop = Event::new(EventKind::WorkerStopped).with_worker("init");

        assert!(!tracker.update(&stop).await);
        assert!(!tracker.update(&start).await);
        assert!(!tracker.is_alive("init").await);
    }

    #[tokio::test]
    async fn snapshot_lists_running_workers() {
        let tracker = AliveTracker::new();
        for name in ["unseal", "health", "init"] {
            tracker
                .update(&Event::new(EventKind::WorkerStarting).with_worker(name))
                .await;
        }
        tracker
            .update(&Event::new(EventKind::WorkerFailed).with_worker("init"))
            .await;

        assert_eq!(tracker.snapshot().await, vec!["health", "unseal"]);
    }

    #[tokio::test]
    async fn same_name_different_ordinal_is_tracked_apart() {
        let tracker = AliveTracker::new();
        let builtin = |kind| Event::new(kind).with_worker("init").with_ordinal(2);
        let extra = |kind| Event::new(kind).with_worker("init").with_ordinal(4);

        tracker.update(&builtin(EventKind::WorkerStarting)).await;
        tracker.update(&extra(EventKind::WorkerStarting)).await;
        tracker.update(&builtin(EventKind::WorkerStopped)).await;

        assert!(tracker.is_alive("init").await);
        assert_eq!(tracker.snapshot().await, vec!["init"]);

        tracker.update(&extra(EventKind::WorkerStopped)).await;
        assert!(tracker.snapshot().await.is_empty());
    }
}
