//! Supervised workers.
//!
//! - [`worker`]: the [`Worker`] trait and its [`WorkerContext`];
//! - [`identity`]: worker names, roles and spawn ordinals;
//! - [`handoff`]: single-use discovery handoff;
//! - [`vault`]: the [`VaultControl`] seam;
//! - [`lifecycle`]: periodic init/unseal workers.
//!
//! The health endpoint worker lives in [`crate::health`].

use std::sync::Arc;

use crate::discovery::DiscoveryResult;

pub mod handoff;
mod identity;
mod lifecycle;
mod vault;
mod worker;

pub use handoff::{HandoffReceiver, HandoffSender};
pub use identity::{Role, WorkerIdentity};
pub use lifecycle::{LifecycleWorker, MIN_TICK};
pub use vault::{DeferredVaultControl, VaultControl};
pub use worker::{BoxWorker, FAULT_CHANNEL_CAPACITY, Worker, WorkerContext, WorkerFault};

/// Discovery output shared by every worker that receives a handoff.
pub type DiscoverySnapshot = Arc<[DiscoveryResult]>;
