//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that lets the
//! supervisor, the runner and every worker publish without blocking.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                 Listener (one):
//!   Supervisor ──┐
//!   Runner     ──┼──────► Bus ───────► subscriber_listener ────► AliveTracker + SubscriberSet
//!   Workers    ──┘  (broadcast chan)     (in Supervisor)
//! ```
//!
//! ## Rules
//! - `publish()` never blocks.
//! - One ring buffer of `capacity` events is shared by all receivers; slow
//!   receivers observe `RecvError::Lagged(n)` and skip `n` events.
//! - Events published with no receiver are dropped.

use tokio::sync::broadcast;

use super::event::Event;

/// Default ring buffer size.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast channel for runtime events.
///
/// Cheap to clone; every clone publishes into the same channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
