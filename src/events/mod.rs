//! Runtime events and the broadcast bus that carries them.
//!
//! - [`event`]: [`Event`] and its [`EventKind`] classification;
//! - [`bus`]: [`Bus`], a non-blocking broadcast channel.

mod bus;
mod event;

pub use bus::{Bus, DEFAULT_CAPACITY};
pub use event::{Event, EventKind};
