//! # Discovery resolution pipeline.
//!
//! [`Resolver::resolve`] turns cluster queries into [`DiscoveryResult`]s, one
//! per query, in input order. Each query runs four chained stages:
//!
//! ```text
//! ClusterQuery
//!   ├─► Region::parse                 (allow-list, no I/O) ── Err ─► ConfigError, stop
//!   ├─► list_tasks                    ── Err ─► TransportError, stop
//!   ├─► describe_tasks                ── failures[] ─► PartialFailure, continue
//!   │      └─► extract (arn, host port) per task; gaps recorded
//!   ├─► describe_container_instances  ── failures[] ─► PartialFailure, continue
//!   ├─► describe_hosts (running only) ── Err ─► TransportError, stop
//!   └─► join on container_instance_arn and ec2_instance_id
//! ```
//!
//! ## Rules
//! - A fault in one query never affects another query.
//! - An empty stage output ends the query without further calls and without a fault.
//! - Duplicate queries are resolved independently and both appear in the output.
//! - No call is retried and no call is bounded by a timeout.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::DebugFlags;
use crate::discovery::api::{Batch, OrchestratorApi, Stage};
use crate::discovery::outcome::classify;
use crate::discovery::types::{
    ClusterQuery, ContainerInstanceRef, DiscoveryResult, HostRef, JoinGap, PrivateEndpoint,
    Region, TaskDescription, VaultEndpoint,
};
use crate::error::{ApiError, DiscoveryError};

/// Resolves cluster queries against an [`OrchestratorApi`].
#[derive(Clone)]
pub struct Resolver {
    api: Arc<dyn OrchestratorApi>,
    flags: DebugFlags,
}

impl Resolver {
    /// Creates a resolver over `api`.
    pub fn new(api: Arc<dyn OrchestratorApi>, flags: DebugFlags) -> Self {
        Self { api, flags }
    }

    /// Resolves every query, sequentially, in input order.
    pub async fn resolve(&self, queries: &[ClusterQuery]) -> Vec<DiscoveryResult> {
        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            info!(cluster = %query.cluster_name, region = %query.region, "resolving cluster");
            let result = self.resolve_one(query).await;
            info!(
                cluster = %result.cluster_name,
                endpoints = result.endpoints.len(),
                faults = result.faults.len(),
                gaps = result.gaps.len(),
                "cluster resolved"
            );
            results.push(result);
        }
        results
    }

    async fn resolve_one(&self, query: &ClusterQuery) -> DiscoveryResult {
        let cluster = query.cluster_name.as_str();
        let mut result = DiscoveryResult::empty(cluster);

        let region = match Region::parse(&query.region) {
            Ok(region) => region,
            Err(fault) => {
                warn!(cluster, fault = %fault, label = fault.as_label(), "rejecting cluster query");
                result.faults.push(fault);
                return result;
            }
        };

        let listed = self.api.list_tasks(&region, cluster).await;
        let Some(tasks) = self.stage(cluster, Stage::ListTasks, listed, &mut result.faults) else {
            return result;
        };
        if tasks.is_empty() {
            debug!(cluster, "no running tasks");
            return result;
        }
        let task_arns: Vec<String> = tasks.into_iter().map(|t| t.task_arn).collect();

        let described = self.api.describe_tasks(&region, cluster, &task_arns).await;
        let Some(descriptions) =
            self.stage(cluster, Stage::DescribeTasks, described, &mut result.faults)
        else {
            return result;
        };
        let placements = extract_placements(descriptions, &mut result.gaps);
        self.dump(cluster, Stage::DescribeTasks, &placements);
        if placements.is_empty() {
            return result;
        }

        let instance_arns = unique(placements.iter().map(|p| &p.container_instance_arn));
        let described = self
            .api
            .describe_container_instances(&region, cluster, &instance_arns)
            .await;
        let Some(hosts) = self.stage(
            cluster,
            Stage::DescribeContainerInstances,
            described,
            &mut result.faults,
        ) else {
            return result;
        };
        self.dump(cluster, Stage::DescribeContainerInstances, &hosts);

        let addresses = if hosts.is_empty() {
            Vec::new()
        } else {
            let host_ids = unique(hosts.iter().map(|h| &h.ec2_instance_id));
            let described = self.api.describe_hosts(&region, &host_ids).await;
            match self.stage(cluster, Stage::DescribeHosts, described, &mut result.faults) {
                Some(addresses) => addresses,
                None => return result,
            }
        };
        self.dump(cluster, Stage::DescribeHosts, &addresses);

        result.endpoints = join(&placements, &hosts, &addresses, &mut result.gaps);
        for gap in &result.gaps {
            debug!(cluster, ?gap, "record dropped by join");
        }
        result
    }

    /// Classifies a stage result, logging every fault it carries.
    fn stage<T>(
        &self,
        cluster: &str,
        stage: Stage,
        result: Result<Batch<T>, ApiError>,
        faults: &mut Vec<DiscoveryError>,
    ) -> Option<Vec<T>> {
        let before = faults.len();
        let items = classify(stage, result).absorb(faults);
        for fault in &faults[before..] {
            warn!(cluster, %stage, fault = %fault, label = fault.as_label(), "discovery fault");
        }
        items
    }

    fn dump<T: std::fmt::Debug>(&self, cluster: &str, stage: Stage, records: &[T]) {
        if self.flags.debug_config {
            debug!(cluster, %stage, ?records, "stage records");
        }
    }
}

/// Extracts `(container_instance_arn, host_port)` per task.
///
/// When a task has several network bindings the last one wins.
fn extract_placements(
    descriptions: Vec<TaskDescription>,
    gaps: &mut Vec<JoinGap>,
) -> Vec<ContainerInstanceRef> {
    let mut placements = Vec::with_capacity(descriptions.len());
    for task in descriptions {
        match (task.container_instance_arn, task.host_ports.last()) {
            (None, _) => gaps.push(JoinGap::TaskWithoutInstance {
                task_arn: task.task_arn,
            }),
            (Some(_), None) => gaps.push(JoinGap::TaskWithoutBinding {
                task_arn: task.task_arn,
            }),
            (Some(container_instance_arn), Some(&host_port)) => {
                placements.push(ContainerInstanceRef {
                    container_instance_arn,
                    host_port,
                })
            }
        }
    }
    placements
}

/// Joins the three stage outputs into endpoints.
///
/// An endpoint is produced only when all three keys match:
/// `address.id == host.id` and `host.arn == placement.arn`.
fn join(
    placements: &[ContainerInstanceRef],
    hosts: &[HostRef],
    addresses: &[PrivateEndpoint],
    gaps: &mut Vec<JoinGap>,
) -> Vec<VaultEndpoint> {
    let mut endpoints = Vec::new();
    for address in addresses {
        for host in hosts
            .iter()
            .filter(|h| h.ec2_instance_id == address.ec2_instance_id)
        {
            for placement in placements
                .iter()
                .filter(|p| p.container_instance_arn == host.container_instance_arn)
            {
                endpoints.push(VaultEndpoint {
                    ip: address.private_ip.clone(),
                    port: placement.host_port,
                });
            }
        }
    }

    for arn in unique(placements.iter().map(|p| &p.container_instance_arn)) {
        if !hosts.iter().any(|h| h.container_instance_arn == arn) {
            gaps.push(JoinGap::UnresolvedInstance {
                container_instance_arn: arn,
            });
        }
    }
    for id in unique(hosts.iter().map(|h| &h.ec2_instance_id)) {
        if !addresses.iter().any(|a| a.ec2_instance_id == id) {
            gaps.push(JoinGap::UnresolvedHost {
                ec2_instance_id: id,
            });
        }
    }
    endpoints
}

/// Order-preserving de-duplication.
fn unique<'a>(ids: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen: HashSet<&'a str> = HashSet::new();
    let mut out = Vec::new();
    for id in ids {
        if seen.insert(id.as_str()) {
            out.push(id.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(arn: &str, port: u16) -> ContainerInstanceRef {
        ContainerInstanceRef {
            container_instance_arn: arn.into(),
            host_port: port,
        }
    }

    fn host(id: &str, arn: &str) -> HostRef {
        HostRef {
            ec2_instance_id: id.into(),
            container_instance_arn: arn.into(),
        }
    }

    fn address(id: &str, ip: &str) -> PrivateEndpoint {
        PrivateEndpoint {
            ec2_instance_id: id.into(),
            private_ip: ip.into(),
        }
    }

    #[test]
    fn last_binding_wins_and_gaps_are_recorded() {
        let mut gaps = Vec::new();
        let placements = extract_placements(
            vec![
                TaskDescription {
                    task_arn: "t1".into(),
                    container_instance_arn: Some("ci1".into()),
                    host_ports: vec![8200, 8300],
                },
                TaskDescription {
                    task_arn: "t2".into(),
                    container_instance_arn: Some("ci2".into()),
                    host_ports: vec![],
                },
                TaskDescription {
                    task_arn: "t3".into(),
                    container_instance_arn: None,
                    host_ports: vec![8200],
                },
            ],
            &mut gaps,
        );

        assert_eq!(placements, vec![placement("ci1", 8300)]);
        assert_eq!(
            gaps,
            vec![
                JoinGap::TaskWithoutBinding {
                    task_arn: "t2".into()
                },
                JoinGap::TaskWithoutInstance {
                    task_arn: "t3".into()
                },
            ]
        );
    }

    #[test]
    fn join_requires_all_keys() {
        let mut gaps = Vec::new();
        let endpoints = join(
            &[placement("ci1", 8200), placement("ci2", 8201)],
            &[host("i-1", "ci1"), host("i-2", "ci-other")],
            &[address("i-1", "10.0.0.1"), address("i-2", "10.0.0.2")],
            &mut gaps,
        );

        assert_eq!(
            endpoints,
            vec![VaultEndpoint {
                ip: "10.0.0.1".into(),
                port: 8200
            }]
        );
        assert_eq!(
            gaps,
            vec![JoinGap::UnresolvedInstance {
                container_instance_arn: "ci2".into()
            }]
        );
    }

    #[test]
    fn two_tasks_on_one_host_yield_two_endpoints() {
        let mut gaps = Vec::new();
        let mut endpoints = join(
            &[placement("ci1", 8200), placement("ci1", 8201)],
            &[host("i-1", "ci1")],
            &[address("i-1", "10.0.0.1")],
            &mut gaps,
        );
        endpoints.sort();

        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].port, 8200);
        assert_eq!(endpoints[1].port, 8201);
        assert!(gaps.is_empty());
    }

    #[test]
    fn stopped_host_is_a_gap() {
        let mut gaps = Vec::new();
        let endpoints = join(
            &[placement("ci1", 8200)],
            &[host("i-1", "ci1")],
            &[],
            &mut gaps,
        );
        assert!(endpoints.is_empty());
        assert_eq!(
            gaps,
            vec![JoinGap::UnresolvedHost {
                ec2_instance_id: "i-1".into()
            }]
        );
    }

    #[test]
    fn unique_preserves_first_occurrence_order() {
        let ids: Vec<String> = ["b", "a", "b", "c", "a"].iter().map(|s| s.to_string()).collect();
        assert_eq!(unique(ids.iter()), vec!["b", "a", "c"]);
    }
}
