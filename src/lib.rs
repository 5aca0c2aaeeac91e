//! k8s-cd-deployer - continuous-deployment trigger for Kubernetes
//!
//! Listens for container registry push notifications and performs a rolling
//! restart of every deployment that runs the pushed tag in an eligible
//! namespace, so it pulls the fresh image.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `policy`: Namespace and image rules deciding what may be restarted
//! - `event`: Image update notification decoding
//! - `inventory`: Workload enumeration and restarts (Kubernetes-backed)
//! - `orchestrator`: Coordinates policy decisions and inventory actions
//! - `ingest`: Message handling and the Kafka transport
//! - `api`: HTTP facade with inventory listings and a manual trigger
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use k8s_cd_deployer::{Config, KubeInventory, RestartOrchestrator, RestartPolicy};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml")?;
//!     config.validate()?;
//!
//!     let policy = RestartPolicy::from_config(&config.policy)?;
//!     let inventory = KubeInventory::try_default(config.cluster.request_timeout()).await?;
//!     let orchestrator = RestartOrchestrator::new(policy, Arc::new(inventory));
//!
//!     orchestrator.restart_matching("gcr.io/project/app:INT").await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod event;
pub mod ingest;
pub mod inventory;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod policy;

// Re-export commonly used types
pub use config::Config;
pub use error::{DeployerError, Result};
pub use event::{EventAction, ImageUpdateEvent};
pub use ingest::{Disposition, ImageEventHandler, MessageHandler};
pub use inventory::{ClusterQuery, KubeInventory, Workload, WorkloadInventory};
pub use orchestrator::{EventOutcome, IgnoreReason, RestartOrchestrator, RestartOutcome, RestartReport};
pub use policy::RestartPolicy;
