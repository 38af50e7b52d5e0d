//! Discovery of vault servers running on a container orchestrator.
//!
//! - [`types`]: records produced by each stage and the per-cluster result;
//! - [`api`]: the orchestration API seam ([`OrchestratorApi`]);
//! - [`outcome`]: uniform classification of stage results;
//! - [`pipeline`]: the [`Resolver`] driving the stages and the join;
//! - [`aws`]: ECS/EC2 implementation of the seam.

pub mod api;
pub mod aws;
pub mod outcome;
pub mod pipeline;
pub mod types;

pub use api::{Batch, OrchestratorApi, ResourceFailure, Stage};
pub use aws::AwsOrchestrator;
pub use outcome::{Outcome, classify};
pub use pipeline::Resolver;
pub use types::{
    ClusterQuery, ContainerInstanceRef, DiscoveryResult, HostRef, JoinGap, PrivateEndpoint,
    Region, SUPPORTED_REGIONS, TaskDescription, TaskRecord, VaultEndpoint,
};
