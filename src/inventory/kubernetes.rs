//! Kubernetes-backed workload inventory
//!
//! Workloads are `apps/v1` Deployments. A restart is the cluster-native
//! rolling restart (the `restartedAt` pod template annotation), so issuing
//! it twice is harmless. Every call is bounded by the configured request
//! timeout.

use super::{ClusterQuery, Workload, WorkloadInventory};
use crate::error::DeployerError;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::Client;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Inventory gateway over the Kubernetes API.
#[derive(Clone)]
pub struct KubeInventory {
    client: Client,
    request_timeout: Duration,
}

impl KubeInventory {
    /// Create a gateway from an existing client.
    pub fn new(client: Client, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
        }
    }

    /// Create a gateway from the ambient kubeconfig or in-cluster service account.
    ///
    /// # Errors
    ///
    /// Returns `DeployerError::Config` if no usable cluster configuration is found.
    pub async fn try_default(request_timeout: Duration) -> Result<Self, DeployerError> {
        let client = Client::try_default()
            .await
            .map_err(|e| DeployerError::Config(format!("Failed to create Kubernetes client: {}", e)))?;

        info!(
            default_namespace = %client.default_namespace(),
            timeout_secs = request_timeout.as_secs(),
            "Kubernetes client ready"
        );

        Ok(Self::new(client, request_timeout))
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, String>
    where
        F: Future<Output = Result<T, kube::Error>>,
    {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "timed out after {}ms",
                self.request_timeout.as_millis()
            )),
        }
    }
}

#[async_trait]
impl WorkloadInventory for KubeInventory {
    async fn list_all(&self) -> Result<Vec<Workload>, DeployerError> {
        let deployments = self.list_deployments().await?;
        let total = deployments.len();

        let workloads: Vec<Workload> = deployments
            .iter()
            .filter_map(|d| {
                let workload = Workload::from_deployment(d);
                if workload.is_none() {
                    debug!(
                        name = ?d.metadata.name,
                        namespace = ?d.metadata.namespace,
                        "Skipping deployment without a container image"
                    );
                }
                workload
            })
            .collect();

        debug!(
            deployments = total,
            workloads = workloads.len(),
            "Listed workloads"
        );

        Ok(workloads)
    }

    async fn restart(&self, namespace: &str, name: &str) -> Result<(), DeployerError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);

        self.bounded(api.restart(name))
            .await
            .map(|_| ())
            .map_err(|reason| DeployerError::RestartFailed {
                namespace: namespace.to_string(),
                name: name.to_string(),
                reason,
            })
    }
}

#[async_trait]
impl ClusterQuery for KubeInventory {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, DeployerError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);

        self.bounded(api.list(&ListParams::default()))
            .await
            .map(|list| list.items)
            .map_err(DeployerError::InventoryUnavailable)
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>, DeployerError> {
        let api: Api<Deployment> = Api::all(self.client.clone());

        self.bounded(api.list(&ListParams::default()))
            .await
            .map(|list| list.items)
            .map_err(DeployerError::InventoryUnavailable)
    }
}
