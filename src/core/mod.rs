//! Supervisor core: phases, worker execution, and shutdown.
//!
//! - [`supervisor`]: sequences discovery, startup, handoff, and the drain;
//! - [`builder`]: assembles a [`Supervisor`];
//! - [`runner`]: runs one worker and publishes its lifecycle events;
//! - [`alive`]: tracks which workers are still running;
//! - [`shutdown`]: OS signal handling;
//! - [`phase`]: the linear phase machine.

mod alive;
mod builder;
mod phase;
mod runner;
mod shutdown;
mod supervisor;

pub use alive::AliveTracker;
pub use builder::SupervisorBuilder;
pub use phase::Phase;
pub use shutdown::wait_for_shutdown_signal;
pub use supervisor::{DrainReason, Supervisor};
