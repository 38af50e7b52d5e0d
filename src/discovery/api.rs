//! # Orchestration API seam.
//!
//! [`OrchestratorApi`] is the boundary to the container orchestrator: four
//! read-only calls, one per pipeline stage. Every call returns a [`Batch`]
//! so the resolver can treat them uniformly; calls that have no inline
//! failure list simply return an empty one.

use std::fmt;

use async_trait::async_trait;

use crate::discovery::types::{HostRef, PrivateEndpoint, Region, TaskDescription, TaskRecord};
use crate::error::ApiError;

/// Pipeline stage, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// List running tasks of a cluster.
    ListTasks,
    /// Describe tasks by arn.
    DescribeTasks,
    /// Describe container instances by arn.
    DescribeContainerInstances,
    /// Describe running hosts by id.
    DescribeHosts,
}

impl Stage {
    /// Stable name used in messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ListTasks => "list-tasks",
            Stage::DescribeTasks => "describe-tasks",
            Stage::DescribeContainerInstances => "describe-container-instances",
            Stage::DescribeHosts => "describe-hosts",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named per-resource failure returned inline by a batch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFailure {
    /// Arn or id of the resource.
    pub resource: String,
    /// Reason reported by the service.
    pub reason: String,
}

impl ResourceFailure {
    /// Creates a failure record.
    pub fn new(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            reason: reason.into(),
        }
    }
}

/// Successes and named failures of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<T> {
    /// Successfully described resources.
    pub items: Vec<T>,
    /// Resources the service could not describe.
    pub failures: Vec<ResourceFailure>,
}

impl<T> Batch<T> {
    /// A batch without failures.
    pub fn ok(items: Vec<T>) -> Self {
        Self {
            items,
            failures: Vec::new(),
        }
    }

    /// A batch with successes and failures.
    pub fn partial(items: Vec<T>, failures: Vec<ResourceFailure>) -> Self {
        Self { items, failures }
    }

    /// Appends another batch (used when a call is chunked).
    pub fn extend(&mut self, other: Batch<T>) {
        self.items.extend(other.items);
        self.failures.extend(other.failures);
    }
}

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self::ok(Vec::new())
    }
}

/// Read-only access to the container orchestrator.
///
/// Implementations perform exactly one logical call per method and never
/// retry. A returned `Err` means the whole call failed.
#[async_trait]
pub trait OrchestratorApi: Send + Sync + 'static {
    /// Lists running tasks of `cluster`.
    async fn list_tasks(&self, region: &Region, cluster: &str)
    -> Result<Batch<TaskRecord>, ApiError>;

    /// Describes `tasks` of `cluster`.
    async fn describe_tasks(
        &self,
        region: &Region,
        cluster: &str,
        tasks: &[String],
    ) -> Result<Batch<TaskDescription>, ApiError>;

    /// Describes container instances of `cluster`.
    async fn describe_container_instances(
        &self,
        region: &Region,
        cluster: &str,
        container_instances: &[String],
    ) -> Result<Batch<HostRef>, ApiError>;

    /// Describes hosts by id, restricted to hosts in the running state.
    async fn describe_hosts(
        &self,
        region: &Region,
        instance_ids: &[String],
    ) -> Result<Batch<PrivateEndpoint>, ApiError>;
}
