//! Workload inventory gateway
//!
//! Abstraction over the cluster API: enumerate every workload the process
//! can see, and request a rolling restart of one of them. The orchestrator
//! and the HTTP facade only ever talk to the cluster through the traits in
//! this module.
//!
//! # Modules
//!
//! - [`kubernetes`]: Kubernetes-backed implementation

pub mod kubernetes;

use crate::error::DeployerError;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};

pub use kubernetes::KubeInventory;

/// Point-in-time snapshot of a deployable unit.
///
/// `image` is the image reference of the first container. Snapshots are
/// fetched fresh for every decision and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Workload {
    /// Workload name
    pub name: String,
    /// Namespace the workload lives in
    pub namespace: String,
    /// Image of the first container
    pub image: String,
}

impl Workload {
    /// Build a snapshot from a Deployment object.
    ///
    /// Returns `None` when the object lacks a name, a namespace, or a first
    /// container with an image.
    pub fn from_deployment(deployment: &Deployment) -> Option<Self> {
        let name = deployment.metadata.name.clone()?;
        let namespace = deployment.metadata.namespace.clone()?;
        let image = deployment
            .spec
            .as_ref()?
            .template
            .spec
            .as_ref()?
            .containers
            .first()?
            .image
            .clone()?;

        Some(Self {
            name,
            namespace,
            image,
        })
    }

    /// `namespace/name`, for logs and reports.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Enumerate and restart workloads.
///
/// Implementations must be safe to call concurrently and must not cache
/// workload state between calls.
#[async_trait]
pub trait WorkloadInventory: Send + Sync {
    /// List every workload in every visible namespace.
    ///
    /// Fails with `DeployerError::InventoryUnavailable` on any transport,
    /// auth or timeout error; a partial listing is never returned.
    async fn list_all(&self) -> Result<Vec<Workload>, DeployerError>;

    /// Request a rolling restart of `namespace/name`.
    ///
    /// Returns once the cluster accepted the request, without waiting for
    /// the rollout. Fails with `DeployerError::RestartFailed`.
    async fn restart(&self, namespace: &str, name: &str) -> Result<(), DeployerError>;
}

/// Read-only passthrough queries used by the HTTP facade.
#[async_trait]
pub trait ClusterQuery: Send + Sync {
    /// Raw pods of one namespace.
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, DeployerError>;

    /// Raw deployments across all namespaces.
    async fn list_deployments(&self) -> Result<Vec<Deployment>, DeployerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::DeploymentSpec;
    use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn deployment(name: Option<&str>, namespace: Option<&str>, images: &[&str]) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: name.map(String::from),
                namespace: namespace.map(String::from),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                template: PodTemplateSpec {
                    metadata: None,
                    spec: Some(PodSpec {
                        containers: images
                            .iter()
                            .enumerate()
                            .map(|(i, image)| Container {
                                name: format!("c{}", i),
                                image: Some(image.to_string()),
                                ..Default::default()
                            })
                            .collect(),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            status: None,
        }
    }

    #[test]
    fn test_from_deployment_uses_first_container() {
        let d = deployment(
            Some("api"),
            Some("svc-int"),
            &["repo/api:INT", "repo/sidecar:1.0"],
        );

        let workload = Workload::from_deployment(&d).unwrap();
        assert_eq!(workload.name, "api");
        assert_eq!(workload.namespace, "svc-int");
        assert_eq!(workload.image, "repo/api:INT");
        assert_eq!(workload.qualified_name(), "svc-int/api");
    }

    #[test]
    fn test_from_deployment_without_containers() {
        let d = deployment(Some("api"), Some("svc-int"), &[]);
        assert!(Workload::from_deployment(&d).is_none());
    }

    #[test]
    fn test_from_deployment_without_spec() {
        let mut d = deployment(Some("api"), Some("svc-int"), &["repo/api:INT"]);
        d.spec = None;
        assert!(Workload::from_deployment(&d).is_none());
    }

    #[test]
    fn test_from_deployment_without_namespace() {
        let d = deployment(Some("api"), None, &["repo/api:INT"]);
        assert!(Workload::from_deployment(&d).is_none());
    }

    #[test]
    fn test_workload_serializes_as_summary() {
        let workload = Workload {
            name: "api".to_string(),
            namespace: "svc-int".to_string(),
            image: "repo/api:INT".to_string(),
        };

        let json = serde_json::to_value(&workload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "api", "namespace": "svc-int", "image": "repo/api:INT"})
        );
    }
}
