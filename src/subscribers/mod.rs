//! # Event subscribers.
//!
//! ```text
//!   Supervisor / Runner / Workers ── publish(Event) ──► Bus ──► listener
//!                                                                 ├──► AliveTracker::update
//!                                                                 └──► SubscriberSet::emit
//!                                                                         ├──► LogWriter
//!                                                                         └──► custom ...
//! ```
//!
//! Implement [`Subscribe`] to observe the runtime (tests attach recorders the same way).

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
