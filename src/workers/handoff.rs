//! # Discovery handoff.
//!
//! A single-use, single-slot transfer from the supervisor to one worker.
//! [`HandoffSender::deliver`] consumes the sender, so a value is written at
//! most once; [`HandoffReceiver::receive`] consumes the receiver, so it is read
//! at most once.
//!
//! ```text
//! Supervisor ── deliver(snapshot) ──► [slot] ──► receive(&token) ──► Worker
//!                                                   │
//!                                   cancelled ──────┴──► Err(Canceled)
//!                                   sender dropped ─────► Err(HandoffDropped)
//! ```

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;

/// Creates a connected sender/receiver pair.
pub fn channel<T>() -> (HandoffSender<T>, HandoffReceiver<T>) {
    let (tx, rx) = oneshot::channel();
    (HandoffSender { tx }, HandoffReceiver { rx })
}

/// Writing half of a handoff.
#[derive(Debug)]
pub struct HandoffSender<T> {
    tx: oneshot::Sender<T>,
}

impl<T> HandoffSender<T> {
    /// Delivers `value`. Returns `false` if the receiver is gone.
    pub fn deliver(self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

/// Reading half of a handoff.
#[derive(Debug)]
pub struct HandoffReceiver<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> HandoffReceiver<T> {
    /// Waits for the value, or for cancellation, whichever comes first.
    pub async fn receive(self, token: &CancellationToken) -> Result<T, WorkerError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(WorkerError::Canceled),
            value = self.rx => value.map_err(|_| WorkerError::HandoffDropped),
        }
    }
}
