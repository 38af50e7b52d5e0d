//! # vaultguard
//!
//! **vaultguard** finds the vault servers running as tasks on ECS clusters and
//! supervises the long-running workers that look after them: a health endpoint
//! and the init/unseal lifecycle workers.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐         ┌────────────────────────────────────────────┐
//!     │    Config    │────────►│  Supervisor                                │
//!     │ (yaml/json)  │ queries │  - Bus (broadcast events)                  │
//!     └──────────────┘         │  - AliveTracker (sequence-ordered state)   │
//!                              │  - SubscriberSet (fans out to subscribers) │
//!                              └───┬───────────────┬────────────────────────┘
//!                                  │ 1. resolve    │ 2. spawn + handoff
//!                                  ▼               ▼
//!     ┌──────────────────────────────┐   ┌───────────┐ ┌──────────┐ ┌────────────┐
//!     │ Resolver                     │   │  health   │ │   init   │ │   unseal   │
//!     │  list_tasks                  │   │  (axum)   │ │ (ticker) │ │  (ticker)  │
//!     │  describe_tasks              │   └─────┬─────┘ └────┬─────┘ └─────┬──────┘
//!     │  describe_container_instances│         │            │             │
//!     │  describe_hosts → join       │         └────────────┴─────┬───────┘
//!     └──────────────┬───────────────┘                            │ events
//!                    ▼                                            ▼
//!            OrchestratorApi                                     Bus ──► LogWriter, ...
//!         (AwsOrchestrator: ECS+EC2)
//! ```
//!
//! ### Lifecycle
//! ```text
//! Idle ─► Discovering ─► Running ─► Draining ─► Stopped
//!           resolve        workers    cancel      grace-bounded
//!           (blocking)     handoff    token       join
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                         |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Discovery**     | Four-stage lookup joined into `https://ip:port` endpoints.   | [`Resolver`], [`OrchestratorApi`]          |
//! | **Supervision**   | Phases, handoff, fault policy, bounded drain.                | [`Supervisor`], [`SupervisorBuilder`]      |
//! | **Workers**       | Health endpoint and periodic init/unseal.                    | [`Worker`], [`LifecycleWorker`], [`HealthServer`] |
//! | **Subscriber API**| Observe runtime events.                                      | [`Subscribe`], [`Event`]                   |
//! | **Errors**        | Typed errors per layer.                                      | [`DiscoveryError`], [`WorkerError`], [`RuntimeError`] |
//! | **Configuration** | YAML/JSON config with tagged endpoint groups.                | [`Config`], [`EndpointGroup`]              |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use vaultguard::{AwsOrchestrator, Config, LogWriter, Subscribe, SupervisorBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::locate_and_load(None)?;
//!     let api = Arc::new(AwsOrchestrator::from_env().await);
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!
//!     let sup = SupervisorBuilder::new(config, api)
//!         .with_subscribers(subs)
//!         .build();
//!     let reason = sup.run().await?;
//!     println!("stopped: {reason}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod discovery;
pub mod error;
pub mod events;
pub mod health;
pub mod logging;
pub mod subscribers;
pub mod workers;

pub use config::{Config, DebugFlags, EndpointGroup, Timings};
pub use core::{DrainReason, Phase, Supervisor, SupervisorBuilder};
pub use discovery::{
    AwsOrchestrator, ClusterQuery, DiscoveryResult, OrchestratorApi, Resolver, VaultEndpoint,
};
pub use error::{ApiError, ConfigError, DiscoveryError, FaultKind, RuntimeError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use health::HealthServer;
pub use subscribers::{LogWriter, Subscribe};
pub use workers::{DeferredVaultControl, LifecycleWorker, VaultControl, Worker, WorkerContext};
