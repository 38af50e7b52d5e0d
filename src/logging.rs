//! Logging setup.
//!
//! `RUST_LOG` wins when set; otherwise the level is `info`, or `debug` when
//! [`DebugFlags::debug`] is on.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::DebugFlags;

/// Installs the global `tracing` subscriber.
///
/// Returns an error if a global subscriber is already installed.
pub fn init(flags: DebugFlags) -> Result<(), tracing_subscriber::util::TryInitError> {
    let default_level = if flags.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
}
