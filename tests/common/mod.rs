#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use vaultguard::discovery::{
    Batch, HostRef, OrchestratorApi, PrivateEndpoint, Region, ResourceFailure, Stage,
    TaskDescription, TaskRecord,
};
use vaultguard::error::ApiError;
use vaultguard::{Config, DebugFlags, Resolver};

/// Scripted state of one cluster.
#[derive(Debug, Clone, Default)]
pub struct FakeCluster {
    pub tasks: Vec<TaskDescription>,
    pub instances: Vec<HostRef>,
    pub list_error: Option<ApiError>,
    pub describe_tasks_error: Option<ApiError>,
    pub instances_error: Option<ApiError>,
    /// Fails any host lookup that includes one of this cluster's instances.
    pub hosts_error: Option<ApiError>,
    pub task_failures: Vec<ResourceFailure>,
    pub instance_failures: Vec<ResourceFailure>,
    pub hang: bool,
}

/// In-memory orchestrator answering from scripted clusters and hosts.
#[derive(Debug, Default)]
pub struct FakeOrchestrator {
    clusters: HashMap<String, FakeCluster>,
    running_hosts: Vec<PrivateEndpoint>,
    calls: Mutex<Vec<(Stage, String)>>,
    requests: Mutex<Vec<(Stage, Vec<String>)>>,
}

impl FakeOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cluster(mut self, name: &str, cluster: FakeCluster) -> Self {
        self.clusters.insert(name.to_owned(), cluster);
        self
    }

    pub fn with_host(mut self, id: &str, ip: &str) -> Self {
        self.running_hosts.push(PrivateEndpoint {
            ec2_instance_id: id.into(),
            private_ip: ip.into(),
        });
        self
    }

    pub fn calls(&self) -> Vec<(Stage, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls made for `cluster`, in order.
    pub fn stages_for(&self, cluster: &str) -> Vec<Stage> {
        self.calls()
            .into_iter()
            .filter(|(_, target)| target == cluster)
            .map(|(stage, _)| stage)
            .collect()
    }

    /// Identifier lists passed to each call of a describe `stage`.
    pub fn requested(&self, stage: Stage) -> Vec<Vec<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == stage)
            .map(|(_, ids)| ids.clone())
            .collect()
    }

    fn record(&self, stage: Stage, target: &str) {
        self.calls.lock().unwrap().push((stage, target.to_owned()));
    }

    fn record_request(&self, stage: Stage, ids: &[String]) {
        self.requests.lock().unwrap().push((stage, ids.to_vec()));
    }

    fn cluster(&self, stage: Stage, name: &str) -> Result<&FakeCluster, ApiError> {
        self.clusters.get(name).ok_or_else(|| {
            ApiError::new(stage, format!("cluster {name} not found"))
                .with_code("ClusterNotFoundException")
        })
    }
}

#[async_trait]
impl OrchestratorApi for FakeOrchestrator {
    async fn list_tasks(
        &self,
        _region: &Region,
        cluster: &str,
    ) -> Result<Batch<TaskRecord>, ApiError> {
        self.record(Stage::ListTasks, cluster);
        let c = self.cluster(Stage::ListTasks, cluster)?;
        if c.hang {
            std::future::pending::<()>().await;
        }
        if let Some(err) = &c.list_error {
            return Err(err.clone());
        }
        Ok(Batch::ok(
            c.tasks
                .iter()
                .map(|t| TaskRecord {
                    task_arn: t.task_arn.clone(),
                })
                .collect(),
        ))
    }

    async fn describe_tasks(
        &self,
        _region: &Region,
        cluster: &str,
        tasks: &[String],
    ) -> Result<Batch<TaskDescription>, ApiError> {
        self.record(Stage::DescribeTasks, cluster);
        self.record_request(Stage::DescribeTasks, tasks);
        let c = self.cluster(Stage::DescribeTasks, cluster)?;
        if let Some(err) = &c.describe_tasks_error {
            return Err(err.clone());
        }
        let items = c
            .tasks
            .iter()
            .filter(|t| tasks.contains(&t.task_arn))
            .filter(|t| !c.task_failures.iter().any(|f| f.resource == t.task_arn))
            .cloned()
            .collect();
        Ok(Batch::partial(items, c.task_failures.clone()))
    }

    async fn describe_container_instances(
        &self,
        _region: &Region,
        cluster: &str,
        container_instances: &[String],
    ) -> Result<Batch<HostRef>, ApiError> {
        self.record(Stage::DescribeContainerInstances, cluster);
        self.record_request(Stage::DescribeContainerInstances, container_instances);
        let c = self.cluster(Stage::DescribeContainerInstances, cluster)?;
        if let Some(err) = &c.instances_error {
            return Err(err.clone());
        }
        let items = c
            .instances
            .iter()
            .filter(|h| container_instances.contains(&h.container_instance_arn))
            .filter(|h| {
                !c.instance_failures
                    .iter()
                    .any(|f| f.resource == h.container_instance_arn)
            })
            .cloned()
            .collect();
        Ok(Batch::partial(items, c.instance_failures.clone()))
    }

    async fn describe_hosts(
        &self,
        _region: &Region,
        instance_ids: &[String],
    ) -> Result<Batch<PrivateEndpoint>, ApiError> {
        self.record(Stage::DescribeHosts, &instance_ids.join(","));
        self.record_request(Stage::DescribeHosts, instance_ids);
        let failing = self.clusters.values().find_map(|c| {
            let owns = c
                .instances
                .iter()
                .any(|h| instance_ids.contains(&h.ec2_instance_id));
            c.hosts_error.as_ref().filter(|_| owns)
        });
        if let Some(err) = failing {
            return Err(err.clone());
        }
        Ok(Batch::ok(
            self.running_hosts
                .iter()
                .filter(|h| instance_ids.contains(&h.ec2_instance_id))
                .cloned()
                .collect(),
        ))
    }
}

pub fn task(arn: &str, container_instance: &str, ports: &[u16]) -> TaskDescription {
    TaskDescription {
        task_arn: arn.into(),
        container_instance_arn: Some(container_instance.into()),
        host_ports: ports.to_vec(),
    }
}

pub fn instance(arn: &str, ec2_instance_id: &str) -> HostRef {
    HostRef {
        ec2_instance_id: ec2_instance_id.into(),
        container_instance_arn: arn.into(),
    }
}

/// Cluster `vault` with two tasks on two hosts, both running.
pub fn two_node_world() -> FakeOrchestrator {
    FakeOrchestrator::new()
        .with_cluster("vault", two_node_cluster())
        .with_host("i-1", "10.0.0.1")
        .with_host("i-2", "10.0.0.2")
}

pub fn two_node_cluster() -> FakeCluster {
    FakeCluster {
        tasks: vec![task("t1", "ci1", &[8200]), task("t2", "ci2", &[8201])],
        instances: vec![instance("ci1", "i-1"), instance("ci2", "i-2")],
        ..FakeCluster::default()
    }
}

/// Cluster `broken` with one task on host `i-9`, next to the two-node `vault`.
pub fn world_with_broken(broken: FakeCluster) -> FakeOrchestrator {
    two_node_world()
        .with_cluster("broken", broken)
        .with_host("i-9", "10.0.9.9")
}

pub fn one_node_cluster() -> FakeCluster {
    FakeCluster {
        tasks: vec![task("t9", "ci9", &[8200])],
        instances: vec![instance("ci9", "i-9")],
        ..FakeCluster::default()
    }
}

pub fn resolver(api: Arc<FakeOrchestrator>) -> Resolver {
    Resolver::new(api, DebugFlags::default())
}

/// Config with one ECS cluster and short timings.
pub fn config(init: bool, unseal: bool, tick_ms: u64) -> Config {
    let raw = format!(
        r#"
app:
  vault:
    vault_endpoints:
      - type: ecs
        spec:
          - cluster: vault
            region: eu-west-1
  vaultguard:
    init: {init}
    unseal: {unseal}
    listen_address: 127.0.0.1
    listen_port: 0
    timings:
      tick_interval_ms: {tick_ms}
      health_shutdown_ms: 5000
      grace_ms: 2000
"#
    );
    Config::from_yaml_str(&raw).unwrap()
}
