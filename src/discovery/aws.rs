//! # AWS implementation of [`OrchestratorApi`].
//!
//! ECS provides tasks and container instances, EC2 provides host addresses.
//! Credentials and endpoint settings come from the ambient AWS default chain;
//! the region is set per call from the validated [`Region`].
//!
//! Batch describe calls accept at most [`DESCRIBE_LIMIT`] identifiers, so
//! larger inputs are split and the partial batches merged.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_ec2::types::Filter;
use aws_sdk_ecs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ecs::types::{DesiredStatus, Failure};
use tracing::debug;

use crate::discovery::api::{Batch, OrchestratorApi, ResourceFailure, Stage};
use crate::discovery::types::{HostRef, PrivateEndpoint, Region, TaskDescription, TaskRecord};
use crate::error::ApiError;

/// Maximum identifiers per ECS describe call.
pub const DESCRIBE_LIMIT: usize = 100;

/// [`OrchestratorApi`] backed by the AWS SDK.
#[derive(Clone, Debug)]
pub struct AwsOrchestrator {
    sdk: SdkConfig,
}

impl AwsOrchestrator {
    /// Loads the shared SDK configuration from the environment.
    pub async fn from_env() -> Self {
        Self::from_sdk_config(aws_config::load_defaults(BehaviorVersion::latest()).await)
    }

    /// Uses an already loaded SDK configuration.
    pub fn from_sdk_config(sdk: SdkConfig) -> Self {
        Self { sdk }
    }

    fn ecs(&self, region: &Region) -> aws_sdk_ecs::Client {
        let conf = aws_sdk_ecs::config::Builder::from(&self.sdk)
            .region(aws_sdk_ecs::config::Region::new(region.as_str().to_owned()))
            .build();
        aws_sdk_ecs::Client::from_conf(conf)
    }

    fn ec2(&self, region: &Region) -> aws_sdk_ec2::Client {
        let conf = aws_sdk_ec2::config::Builder::from(&self.sdk)
            .region(aws_sdk_ec2::config::Region::new(region.as_str().to_owned()))
            .build();
        aws_sdk_ec2::Client::from_conf(conf)
    }
}

#[async_trait]
impl OrchestratorApi for AwsOrchestrator {
    async fn list_tasks(
        &self,
        region: &Region,
        cluster: &str,
    ) -> Result<Batch<TaskRecord>, ApiError> {
        let mut pages = self
            .ecs(region)
            .list_tasks()
            .cluster(cluster)
            .desired_status(DesiredStatus::Running)
            .into_paginator()
            .send();

        let mut tasks = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| api_error(Stage::ListTasks, e))?;
            tasks.extend(page.task_arns().iter().map(|arn| TaskRecord {
                task_arn: arn.clone(),
            }));
        }
        debug!(cluster, count = tasks.len(), "listed tasks");
        Ok(Batch::ok(tasks))
    }

    async fn describe_tasks(
        &self,
        region: &Region,
        cluster: &str,
        tasks: &[String],
    ) -> Result<Batch<TaskDescription>, ApiError> {
        let client = self.ecs(region);
        let mut batch = Batch::default();
        for chunk in tasks.chunks(DESCRIBE_LIMIT) {
            let out = client
                .describe_tasks()
                .cluster(cluster)
                .set_tasks(Some(chunk.to_vec()))
                .send()
                .await
                .map_err(|e| api_error(Stage::DescribeTasks, e))?;

            let items = out
                .tasks()
                .iter()
                .map(|task| TaskDescription {
                    task_arn: task.task_arn().unwrap_or_default().to_owned(),
                    container_instance_arn: task.container_instance_arn().map(str::to_owned),
                    host_ports: task
                        .containers()
                        .iter()
                        .flat_map(|c| c.network_bindings().iter())
                        .filter_map(|b| b.host_port())
                        .filter_map(|p| u16::try_from(p).ok())
                        .collect(),
                })
                .collect();
            batch.extend(Batch::partial(items, failures(out.failures())));
        }
        Ok(batch)
    }

    async fn describe_container_instances(
        &self,
        region: &Region,
        cluster: &str,
        container_instances: &[String],
    ) -> Result<Batch<HostRef>, ApiError> {
        let client = self.ecs(region);
        let mut batch = Batch::default();
        for chunk in container_instances.chunks(DESCRIBE_LIMIT) {
            let out = client
                .describe_container_instances()
                .cluster(cluster)
                .set_container_instances(Some(chunk.to_vec()))
                .send()
                .await
                .map_err(|e| api_error(Stage::DescribeContainerInstances, e))?;

            let items = out
                .container_instances()
                .iter()
                .filter_map(|ci| {
                    Some(HostRef {
                        ec2_instance_id: ci.ec2_instance_id()?.to_owned(),
                        container_instance_arn: ci.container_instance_arn()?.to_owned(),
                    })
                })
                .collect();
            batch.extend(Batch::partial(items, failures(out.failures())));
        }
        Ok(batch)
    }

    async fn describe_hosts(
        &self,
        region: &Region,
        instance_ids: &[String],
    ) -> Result<Batch<PrivateEndpoint>, ApiError> {
        let running = Filter::builder()
            .name("instance-state-name")
            .values("running")
            .build();

        let out = self
            .ec2(region)
            .describe_instances()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .filters(running)
            .send()
            .await
            .map_err(|e| api_error(Stage::DescribeHosts, e))?;

        let hosts = out
            .reservations()
            .iter()
            .flat_map(|r| r.instances().iter())
            .filter_map(|i| {
                Some(PrivateEndpoint {
                    ec2_instance_id: i.instance_id()?.to_owned(),
                    private_ip: i.private_ip_address()?.to_owned(),
                })
            })
            .collect();
        Ok(Batch::ok(hosts))
    }
}

fn failures(raw: &[Failure]) -> Vec<ResourceFailure> {
    raw.iter()
        .map(|f| {
            let reason = match (f.reason(), f.detail()) {
                (Some(reason), Some(detail)) => format!("{reason}: {detail}"),
                (Some(reason), None) => reason.to_owned(),
                (None, Some(detail)) => detail.to_owned(),
                (None, None) => "unknown".to_owned(),
            };
            ResourceFailure::new(f.arn().unwrap_or("unknown"), reason)
        })
        .collect()
}

fn api_error<E, R>(stage: Stage, err: SdkError<E, R>) -> ApiError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_owned);
    let error = ApiError::new(stage, DisplayErrorContext(&err).to_string());
    match code {
        Some(code) => error.with_code(code),
        None => error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_failures_keep_reason_and_detail() {
        let raw = [
            Failure::builder()
                .arn("t1")
                .reason("MISSING")
                .detail("task stopped")
                .build(),
            Failure::builder().arn("t2").reason("MISSING").build(),
            Failure::builder().build(),
        ];

        assert_eq!(
            failures(&raw),
            vec![
                ResourceFailure::new("t1", "MISSING: task stopped"),
                ResourceFailure::new("t2", "MISSING"),
                ResourceFailure::new("unknown", "unknown"),
            ]
        );
    }
}
