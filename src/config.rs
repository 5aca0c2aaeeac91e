//! Configuration management for k8s-cd-deployer
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files and environment variables. Configuration is
//! loaded once at startup and treated as immutable afterwards.

use crate::error::{DeployerError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Restart policy patterns
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Kafka subscription for image update events
    #[serde(default)]
    pub kafka: KafkaConfig,

    /// Kubernetes API settings
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// HTTP facade settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics exporter configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Restart policy configuration
///
/// Both patterns are regular expressions that must match the whole value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Namespaces eligible for automatic restarts
    #[serde(default = "default_namespace_pattern")]
    pub namespace_pattern: String,

    /// Image tags eligible to trigger any restart at all
    #[serde(default = "default_image_pattern")]
    pub image_pattern: String,
}

fn default_namespace_pattern() -> String {
    ".*-int$".to_string()
}

fn default_image_pattern() -> String {
    ".*:INT$".to_string()
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            namespace_pattern: default_namespace_pattern(),
            image_pattern: default_image_pattern(),
        }
    }
}

/// Kafka consumer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    /// Kafka brokers (comma-separated)
    #[serde(default = "default_brokers")]
    pub brokers: String,

    /// Topic carrying registry push notifications
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Subscription identifier, used as the consumer group ID
    #[serde(default = "default_subscription")]
    pub subscription: String,

    /// Delay before a rejected message is offered again
    #[serde(default = "default_redelivery_delay_ms")]
    pub redelivery_delay_ms: u64,

    /// Security configuration
    #[serde(default)]
    pub security: Option<KafkaSecurityConfig>,
}

fn default_brokers() -> String {
    "localhost:9092".to_string()
}

fn default_topic() -> String {
    "gcr".to_string()
}

fn default_subscription() -> String {
    "gcr-pull".to_string()
}

fn default_redelivery_delay_ms() -> u64 {
    5000
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            topic: default_topic(),
            subscription: default_subscription(),
            redelivery_delay_ms: default_redelivery_delay_ms(),
            security: None,
        }
    }
}

/// Kafka security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaSecurityConfig {
    /// Security protocol (PLAINTEXT, SSL, SASL_PLAINTEXT, SASL_SSL)
    pub protocol: String,

    /// SASL mechanism (PLAIN, SCRAM-SHA-256, SCRAM-SHA-512)
    pub sasl_mechanism: Option<String>,

    /// SASL username
    pub sasl_username: Option<String>,

    /// SASL password (prefer env var KAFKA_SASL_PASSWORD)
    pub sasl_password: Option<String>,

    /// CA certificate path for SSL protocols
    #[serde(default)]
    pub ssl_ca_location: Option<String>,
}

/// Kubernetes API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Upper bound for a single list or restart call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ClusterConfig {
    /// Bound applied to every cluster call
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// HTTP facade configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Serve the inventory and manual trigger endpoints
    #[serde(default = "default_server_enabled")]
    pub enabled: bool,

    /// Listen address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_server_enabled() -> bool {
    true
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_server_enabled(),
            bind_address: default_bind_address(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON-formatted logs
    #[serde(default)]
    pub json_format: bool,

    /// Log file path (if None, STDOUT only)
    pub file_path: Option<PathBuf>,

    /// Include the raw message payload in decode failure logs
    #[serde(default)]
    pub include_payload: bool,
}

fn default_log_level() -> String {
    "k8s_cd_deployer=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
            include_payload: false,
        }
    }
}

/// Metrics exporter configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetricsConfig {
    /// Prometheus scrape listener (requires the `prometheus` feature)
    #[serde(default)]
    pub listen_address: Option<String>,
}

/// Something noteworthy that happened while the configuration was assembled.
///
/// Loading happens before logging is initialized, so these are collected
/// and emitted once a subscriber exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadNotice {
    /// The config file does not exist; defaults are in effect
    FileMissing(String),
    /// An environment variable replaced a configured value
    Override(&'static str),
    /// An environment variable was set but could not be parsed
    InvalidOverride { key: &'static str, value: String },
}

impl LoadNotice {
    /// Emit the notice through `tracing`
    pub fn log(&self) {
        match self {
            Self::FileMissing(path) => {
                tracing::warn!("Config file not found at {}, using defaults", path)
            }
            Self::Override(key) => tracing::debug!("Env override: {}", key),
            Self::InvalidOverride { key, value } => {
                tracing::warn!("Invalid value for {}: {}", key, value)
            }
        }
    }
}

fn invalid(key: &'static str, value: String) -> LoadNotice {
    LoadNotice::InvalidOverride { key, value }
}

impl Config {
    /// Load configuration from file with environment overrides
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged. Notices are logged immediately, so call this only once a
    /// subscriber is installed; otherwise use [`Config::load_with_notices`].
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str) -> Result<Self> {
        let (config, notices) = Self::load_with_notices(path)?;
        notices.iter().for_each(LoadNotice::log);
        Ok(config)
    }

    /// Load configuration and return the notices instead of logging them.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load_with_notices(path: &str) -> Result<(Self, Vec<LoadNotice>)> {
        let mut notices = Vec::new();

        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            notices.push(LoadNotice::FileMissing(path.to_string()));
            Self::default()
        };

        notices.extend(config.apply_env_vars());

        Ok((config, notices))
    }

    fn from_file(path: &str) -> std::result::Result<Self, DeployerError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    fn apply_env_vars(&mut self) -> Vec<LoadNotice> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `K8S_CD_DEPLOYER_*` overrides read through `lookup`
    fn apply_overrides<F>(&mut self, lookup: F) -> Vec<LoadNotice>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut notices = Vec::new();
        let mut set = |key: &'static str| -> Option<String> {
            let value = lookup(key)?;
            notices.push(LoadNotice::Override(key));
            Some(value)
        };

        if let Some(pattern) = set("K8S_CD_DEPLOYER_NAMESPACE_REGEX") {
            self.policy.namespace_pattern = pattern;
        }

        if let Some(pattern) = set("K8S_CD_DEPLOYER_IMAGE_REGEX") {
            self.policy.image_pattern = pattern;
        }

        if let Some(brokers) = set("K8S_CD_DEPLOYER_KAFKA_BROKERS") {
            self.kafka.brokers = brokers;
        }

        if let Some(topic) = set("K8S_CD_DEPLOYER_KAFKA_TOPIC") {
            self.kafka.topic = topic;
        }

        if let Some(subscription) = set("K8S_CD_DEPLOYER_SUBSCRIPTION") {
            self.kafka.subscription = subscription;
        }

        let delay = set("K8S_CD_DEPLOYER_REDELIVERY_DELAY_MS");
        let protocol = set("K8S_CD_DEPLOYER_KAFKA_SECURITY_PROTOCOL");
        let timeout = set("K8S_CD_DEPLOYER_REQUEST_TIMEOUT");
        let enabled = set("K8S_CD_DEPLOYER_SERVER_ENABLED");
        let address = set("K8S_CD_DEPLOYER_BIND_ADDRESS");
        let level = set("K8S_CD_DEPLOYER_LOG_LEVEL");
        let json_logs = set("K8S_CD_DEPLOYER_JSON_LOGS");
        let log_file = set("K8S_CD_DEPLOYER_LOG_FILE");

        if let Some(protocol) = protocol {
            self.kafka.security = Some(KafkaSecurityConfig {
                protocol,
                sasl_mechanism: lookup("K8S_CD_DEPLOYER_KAFKA_SASL_MECHANISM"),
                sasl_username: lookup("K8S_CD_DEPLOYER_KAFKA_SASL_USERNAME"),
                sasl_password: lookup("KAFKA_SASL_PASSWORD"),
                ssl_ca_location: lookup("K8S_CD_DEPLOYER_KAFKA_SSL_CA_LOCATION"),
            });
        }

        if let Some(delay) = delay {
            match delay.parse::<u64>() {
                Ok(v) => self.kafka.redelivery_delay_ms = v,
                Err(_) => notices.push(invalid("K8S_CD_DEPLOYER_REDELIVERY_DELAY_MS", delay)),
            }
        }

        if let Some(timeout) = timeout {
            match timeout.parse::<u64>() {
                Ok(v) => self.cluster.request_timeout_secs = v,
                Err(_) => notices.push(invalid("K8S_CD_DEPLOYER_REQUEST_TIMEOUT", timeout)),
            }
        }

        if let Some(enabled) = enabled {
            match enabled.parse::<bool>() {
                Ok(v) => self.server.enabled = v,
                Err(_) => notices.push(invalid("K8S_CD_DEPLOYER_SERVER_ENABLED", enabled)),
            }
        }

        if let Some(address) = address {
            self.server.bind_address = address;
        }

        if let Some(level) = level {
            self.logging.level = level;
        }

        if let Some(json_logs) = json_logs {
            match json_logs.parse::<bool>() {
                Ok(v) => self.logging.json_format = v,
                Err(_) => notices.push(invalid("K8S_CD_DEPLOYER_JSON_LOGS", json_logs)),
            }
        }

        if let Some(log_file) = log_file {
            self.logging.file_path = Some(PathBuf::from(log_file));
        }

        notices
    }

    /// Validate the configuration
    ///
    /// Runs once at startup. The policy patterns are compiled here so a
    /// malformed pattern stops the process before any event is consumed.
    ///
    /// # Errors
    ///
    /// Returns `DeployerError::Config` if any check fails
    pub fn validate(&self) -> std::result::Result<(), DeployerError> {
        crate::policy::RestartPolicy::from_config(&self.policy)?;

        if self.kafka.subscription.trim().is_empty() {
            return Err(DeployerError::Config(
                "kafka.subscription cannot be empty".to_string(),
            ));
        }

        if self.kafka.topic.trim().is_empty() {
            return Err(DeployerError::Config(
                "kafka.topic cannot be empty".to_string(),
            ));
        }

        if self.kafka.brokers.trim().is_empty() {
            return Err(DeployerError::Config(
                "kafka.brokers cannot be empty".to_string(),
            ));
        }

        if let Some(security) = &self.kafka.security {
            let valid_protocols = ["PLAINTEXT", "SSL", "SASL_PLAINTEXT", "SASL_SSL"];
            if !valid_protocols.contains(&security.protocol.to_uppercase().as_str()) {
                return Err(DeployerError::Config(format!(
                    "Invalid security protocol: {}. Must be one of: {}",
                    security.protocol,
                    valid_protocols.join(", ")
                )));
            }
        }

        if self.cluster.request_timeout_secs == 0 {
            return Err(DeployerError::Config(
                "cluster.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.server.enabled {
            self.server.bind_address.parse::<SocketAddr>().map_err(|e| {
                DeployerError::Config(format!(
                    "Invalid server.bind_address '{}': {}",
                    self.server.bind_address, e
                ))
            })?;
        }

        Ok(())
    }
}
