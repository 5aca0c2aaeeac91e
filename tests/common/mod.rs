use async_trait::async_trait;
use k8s_cd_deployer::inventory::{ClusterQuery, Workload, WorkloadInventory};
use k8s_cd_deployer::DeployerError;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn workload(namespace: &str, name: &str, image: &str) -> Workload {
    Workload {
        name: name.to_string(),
        namespace: namespace.to_string(),
        image: image.to_string(),
    }
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// In-memory cluster that records every restart request.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeInventory {
    workloads: Vec<Workload>,
    failing: HashSet<(String, String)>,
    list_fails: AtomicBool,
    list_calls: AtomicUsize,
    restarts: Mutex<Vec<(String, String)>>,
    restart_delay: Option<Duration>,
}

#[allow(dead_code)]
impl FakeInventory {
    pub fn new(workloads: Vec<Workload>) -> Self {
        Self {
            workloads,
            ..Default::default()
        }
    }

    pub fn failing_restart(mut self, namespace: &str, name: &str) -> Self {
        self.failing
            .insert((namespace.to_string(), name.to_string()));
        self
    }

    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = Some(delay);
        self
    }

    pub fn set_list_failure(&self, fails: bool) {
        self.list_fails.store(fails, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn restart_calls(&self) -> Vec<(String, String)> {
        let mut calls = self.restarts.lock().unwrap().clone();
        calls.sort();
        calls
    }

    fn check_list(&self) -> Result<(), DeployerError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(DeployerError::InventoryUnavailable(
                "connection refused".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl WorkloadInventory for FakeInventory {
    async fn list_all(&self) -> Result<Vec<Workload>, DeployerError> {
        self.check_list()?;
        Ok(self.workloads.clone())
    }

    async fn restart(&self, namespace: &str, name: &str) -> Result<(), DeployerError> {
        if let Some(delay) = self.restart_delay {
            tokio::time::sleep(delay).await;
        }

        self.restarts
            .lock()
            .unwrap()
            .push((namespace.to_string(), name.to_string()));

        if self
            .failing
            .contains(&(namespace.to_string(), name.to_string()))
        {
            return Err(DeployerError::RestartFailed {
                namespace: namespace.to_string(),
                name: name.to_string(),
                reason: "forbidden".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterQuery for FakeInventory {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, DeployerError> {
        self.check_list()?;
        Ok(self
            .workloads
            .iter()
            .filter(|w| w.namespace == namespace)
            .map(|w| Pod {
                metadata: ObjectMeta {
                    name: Some(format!("{}-0", w.name)),
                    namespace: Some(w.namespace.clone()),
                    ..Default::default()
                },
                ..Default::default()
            })
            .collect())
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>, DeployerError> {
        self.check_list()?;
        Ok(self.workloads.iter().map(to_deployment).collect())
    }
}

fn to_deployment(workload: &Workload) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(workload.name.clone()),
            namespace: Some(workload.namespace.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            template: PodTemplateSpec {
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: "app".to_string(),
                        image: Some(workload.image.clone()),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
