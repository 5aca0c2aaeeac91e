//! Error types for k8s-cd-deployer
//!
//! This module defines the error types used throughout the deployer,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for deployer operations
///
/// The variants mirror the failure classes the deployer distinguishes:
/// configuration problems are fatal at startup, decode failures drop a single
/// message, `InventoryUnavailable` fails a whole event (and leads to
/// redelivery), and `RestartFailed` is scoped to a single workload.
#[derive(Error, Debug)]
pub enum DeployerError {
    /// Configuration-related errors (malformed policy pattern, missing identifier)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Workload enumeration failed (transport, auth or timeout)
    #[error("Inventory unavailable: {0}")]
    InventoryUnavailable(String),

    /// A single workload's restart request was rejected or timed out
    #[error("Restart failed for {namespace}/{name}: {reason}")]
    RestartFailed {
        /// Namespace of the workload
        namespace: String,
        /// Name of the workload
        name: String,
        /// Why the cluster rejected the request
        reason: String,
    },

    /// Payload is not a recognized image update event
    #[error("Decode error: {0}")]
    Decode(String),

    /// Event transport errors
    #[error("Consumer error: {0}")]
    Consumer(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl DeployerError {
    /// Returns true when the error should leave the inbound message for redelivery
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InventoryUnavailable(_))
    }
}

/// Result type alias for application-level operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
