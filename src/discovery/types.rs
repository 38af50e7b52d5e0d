//! # Discovery data model.
//!
//! Records produced by each stage of the pipeline, keyed so they can be joined:
//! ```text
//! TaskRecord ──describe-tasks──► ContainerInstanceRef{arn, port}
//!                                        │ container_instance_arn
//!                                        ▼
//!                                HostRef{ec2_instance_id, arn}
//!                                        │ ec2_instance_id
//!                                        ▼
//!                                PrivateEndpoint{id, ip}  ──► VaultEndpoint{ip, port}
//! ```

use std::fmt;

use crate::error::DiscoveryError;

/// Regions vaultguard is allowed to query.
pub const SUPPORTED_REGIONS: &[&str] = &["eu-west-1", "eu-west-2"];

/// A region that passed the allow-list check.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region(String);

impl Region {
    /// Validates `name` against [`SUPPORTED_REGIONS`].
    ///
    /// No I/O happens here; a rejected region is reported as
    /// [`DiscoveryError::UnsupportedRegion`].
    pub fn parse(name: &str) -> Result<Self, DiscoveryError> {
        if SUPPORTED_REGIONS.contains(&name) {
            Ok(Self(name.to_owned()))
        } else {
            Err(DiscoveryError::UnsupportedRegion {
                region: name.to_owned(),
            })
        }
    }

    /// Region name as passed to the orchestration API.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Input to the pipeline: one cluster in one region.
///
/// The region is kept as configured; it is validated when the query is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterQuery {
    /// Region name as configured.
    pub region: String,
    /// ECS cluster name or arn.
    pub cluster_name: String,
}

impl ClusterQuery {
    /// Creates a query.
    pub fn new(region: impl Into<String>, cluster_name: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            cluster_name: cluster_name.into(),
        }
    }
}

/// Stage 1 output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    /// Task arn.
    pub task_arn: String,
}

/// A task as returned by the describe-tasks call, before extraction.
///
/// Either field may be missing; such tasks are join gaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescription {
    /// Task arn.
    pub task_arn: String,
    /// Container instance the task is placed on.
    pub container_instance_arn: Option<String>,
    /// Host ports of all network bindings, in container order.
    pub host_ports: Vec<u16>,
}

/// Stage 2 output: where a task listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInstanceRef {
    /// Container instance arn.
    pub container_instance_arn: String,
    /// Host port of the task's binding.
    pub host_port: u16,
}

/// Stage 3 output: which host backs a container instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRef {
    /// Host (EC2 instance) id.
    pub ec2_instance_id: String,
    /// Container instance arn.
    pub container_instance_arn: String,
}

/// Stage 4 output: private address of a running host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateEndpoint {
    /// Host (EC2 instance) id.
    pub ec2_instance_id: String,
    /// Private IP address.
    pub private_ip: String,
}

/// A reachable vault server.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VaultEndpoint {
    /// Private IP address of the host.
    pub ip: String,
    /// Host port of the task.
    pub port: u16,
}

impl VaultEndpoint {
    /// Renders the endpoint as `https://ip:port`.
    pub fn url(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for VaultEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "https://{}:{}", self.ip, self.port)
    }
}

/// An intermediate record that could not be joined and was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinGap {
    /// A task has no container instance arn.
    TaskWithoutInstance {
        /// Task arn.
        task_arn: String,
    },
    /// A task has no network binding.
    TaskWithoutBinding {
        /// Task arn.
        task_arn: String,
    },
    /// A container instance referenced by a task was not described.
    UnresolvedInstance {
        /// Container instance arn.
        container_instance_arn: String,
    },
    /// A host backing a container instance is not running or has no address.
    UnresolvedHost {
        /// Host (EC2 instance) id.
        ec2_instance_id: String,
    },
}

/// Outcome of resolving one [`ClusterQuery`].
///
/// Non-empty `faults` does not imply empty `endpoints`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryResult {
    /// Cluster the result belongs to.
    pub cluster_name: String,
    /// Joined endpoints.
    pub endpoints: Vec<VaultEndpoint>,
    /// Faults recorded while resolving.
    pub faults: Vec<DiscoveryError>,
    /// Records dropped by the join. Not faults.
    pub gaps: Vec<JoinGap>,
}

impl DiscoveryResult {
    /// Creates an empty result for `cluster_name`.
    pub fn empty(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            endpoints: Vec::new(),
            faults: Vec::new(),
            gaps: Vec::new(),
        }
    }

    /// Endpoints rendered as URLs, sorted.
    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.endpoints.iter().map(VaultEndpoint::url).collect();
        urls.sort_unstable();
        urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultKind;

    #[test]
    fn region_allow_list() {
        assert_eq!(Region::parse("eu-west-1").unwrap().as_str(), "eu-west-1");
        assert!(Region::parse("eu-west-2").is_ok());

        let err = Region::parse("us-east-1").unwrap_err();
        assert_eq!(err.kind(), FaultKind::ConfigError);
        assert!(Region::parse("").is_err());
        assert!(Region::parse("EU-WEST-1").is_err());
    }

    #[test]
    fn endpoint_renders_as_https_url() {
        let ep = VaultEndpoint {
            ip: "10.0.0.1".into(),
            port: 8200,
        };
        assert_eq!(ep.url(), "https://10.0.0.1:8200");
    }
}
