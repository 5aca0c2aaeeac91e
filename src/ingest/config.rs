//! Kafka consumer configuration.
//!
//! Translates the `kafka` section of the deployer configuration into the
//! librdkafka settings used by [`super::kafka::EventConsumer`].
//!
//! # Example
//!
//! ```rust
//! use k8s_cd_deployer::ingest::config::KafkaConsumerConfig;
//!
//! let config = KafkaConsumerConfig::new("localhost:9092", "gcr", "gcr-pull")
//!     .with_sasl_scram_sha256("username", "password");
//! assert_eq!(config.group_id, "gcr-pull");
//! ```

use crate::config::KafkaConfig;
use crate::error::DeployerError;
use std::str::FromStr;
use std::time::Duration;

/// Security protocol for Kafka connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SecurityProtocol {
    /// No encryption or authentication.
    #[default]
    Plaintext,
    /// TLS encryption without SASL.
    Ssl,
    /// SASL authentication without TLS.
    SaslPlaintext,
    /// SASL authentication with TLS encryption.
    SaslSsl,
}

impl SecurityProtocol {
    /// Returns the librdkafka configuration string for this protocol.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plaintext => "PLAINTEXT",
            Self::Ssl => "SSL",
            Self::SaslPlaintext => "SASL_PLAINTEXT",
            Self::SaslSsl => "SASL_SSL",
        }
    }
}

impl FromStr for SecurityProtocol {
    type Err = DeployerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PLAINTEXT" => Ok(Self::Plaintext),
            "SSL" => Ok(Self::Ssl),
            "SASL_PLAINTEXT" => Ok(Self::SaslPlaintext),
            "SASL_SSL" => Ok(Self::SaslSsl),
            _ => Err(DeployerError::Config(format!(
                "Invalid security protocol: {}",
                s
            ))),
        }
    }
}

/// SASL authentication mechanism.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SaslMechanism {
    /// PLAIN mechanism (username/password in clear text).
    Plain,
    /// SCRAM-SHA-256 mechanism.
    #[default]
    ScramSha256,
    /// SCRAM-SHA-512 mechanism.
    ScramSha512,
}

impl SaslMechanism {
    /// Returns the librdkafka configuration string for this mechanism.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::ScramSha256 => "SCRAM-SHA-256",
            Self::ScramSha512 => "SCRAM-SHA-512",
        }
    }
}

impl FromStr for SaslMechanism {
    type Err = DeployerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PLAIN" => Ok(Self::Plain),
            "SCRAM-SHA-256" => Ok(Self::ScramSha256),
            "SCRAM-SHA-512" => Ok(Self::ScramSha512),
            _ => Err(DeployerError::Config(format!("Invalid SASL mechanism: {}", s))),
        }
    }
}

/// SASL authentication configuration.
#[derive(Debug, Clone)]
pub struct SaslConfig {
    /// Authentication mechanism to use.
    pub mechanism: SaslMechanism,
    /// SASL username.
    pub username: String,
    /// SASL password.
    pub password: String,
}

/// SSL/TLS configuration.
#[derive(Debug, Clone)]
pub struct SslConfig {
    /// Path to CA certificate file.
    pub ca_location: String,
}

/// Kafka consumer configuration.
#[derive(Debug, Clone)]
pub struct KafkaConsumerConfig {
    /// Kafka broker addresses (comma-separated).
    pub brokers: String,

    /// Topic carrying registry notifications.
    pub topic: String,

    /// Consumer group ID; the subscription identifier.
    pub group_id: String,

    /// Security protocol for the connection.
    pub security_protocol: SecurityProtocol,

    /// SASL configuration (required for SASL protocols).
    pub sasl_config: Option<SaslConfig>,

    /// SSL configuration.
    pub ssl_config: Option<SslConfig>,

    /// Auto offset reset policy ("earliest" or "latest").
    pub auto_offset_reset: String,

    /// Session timeout duration.
    pub session_timeout: Duration,

    /// Wait before a rejected message is offered again.
    pub redelivery_delay: Duration,
}

impl KafkaConsumerConfig {
    /// Creates a new configuration with sensible defaults.
    ///
    /// # Arguments
    ///
    /// * `brokers` - Comma-separated list of Kafka broker addresses
    /// * `topic` - Topic to consume from
    /// * `subscription` - Subscription identifier, used as the consumer group
    pub fn new(brokers: &str, topic: &str, subscription: &str) -> Self {
        Self {
            brokers: brokers.to_string(),
            topic: topic.to_string(),
            group_id: subscription.to_string(),
            security_protocol: SecurityProtocol::default(),
            sasl_config: None,
            ssl_config: None,
            auto_offset_reset: "earliest".to_string(),
            session_timeout: Duration::from_secs(30),
            redelivery_delay: Duration::from_secs(5),
        }
    }

    /// Configures SASL/SCRAM-SHA-256 authentication over TLS.
    pub fn with_sasl_scram_sha256(mut self, username: &str, password: &str) -> Self {
        self.security_protocol = SecurityProtocol::SaslSsl;
        self.sasl_config = Some(SaslConfig {
            mechanism: SaslMechanism::ScramSha256,
            username: username.to_string(),
            password: password.to_string(),
        });
        self
    }

    /// Configures SSL/TLS encryption with a CA certificate.
    pub fn with_ssl(mut self, ca_location: &str) -> Self {
        self.ssl_config = Some(SslConfig {
            ca_location: ca_location.to_string(),
        });
        self
    }

    /// Sets the redelivery delay for rejected messages.
    pub fn with_redelivery_delay(mut self, delay: Duration) -> Self {
        self.redelivery_delay = delay;
        self
    }

    /// Build the consumer configuration from the `kafka` config section.
    ///
    /// The SASL password falls back to the `KAFKA_SASL_PASSWORD` environment
    /// variable when the file does not carry one.
    ///
    /// # Errors
    ///
    /// Returns `DeployerError::Config` for an unknown protocol or mechanism,
    /// or when SASL is requested without credentials.
    pub fn from_settings(settings: &KafkaConfig) -> Result<Self, DeployerError> {
        let mut config = Self::new(&settings.brokers, &settings.topic, &settings.subscription)
            .with_redelivery_delay(Duration::from_millis(settings.redelivery_delay_ms));

        let Some(security) = &settings.security else {
            return Ok(config);
        };

        config.security_protocol = security.protocol.parse()?;

        if let Some(ca) = &security.ssl_ca_location {
            config = config.with_ssl(ca);
        }

        if let Some(mechanism) = &security.sasl_mechanism {
            let username = security.sasl_username.as_ref().ok_or_else(|| {
                DeployerError::Config("SASL username is required when mechanism is set".to_string())
            })?;

            let password = security
                .sasl_password
                .clone()
                .or_else(|| std::env::var("KAFKA_SASL_PASSWORD").ok())
                .ok_or_else(|| {
                    DeployerError::Config(
                        "SASL password required (set via config or KAFKA_SASL_PASSWORD env var)"
                            .to_string(),
                    )
                })?;

            config.sasl_config = Some(SaslConfig {
                mechanism: mechanism.parse()?,
                username: username.clone(),
                password,
            });
        }

        Ok(config)
    }

    /// librdkafka key-value settings for this configuration.
    ///
    /// Offsets are always committed manually so the ingestion loop controls
    /// redelivery.
    pub fn client_settings(&self) -> Vec<(String, String)> {
        let mut settings = vec![
            ("bootstrap.servers".to_string(), self.brokers.clone()),
            ("group.id".to_string(), self.group_id.clone()),
            (
                "auto.offset.reset".to_string(),
                self.auto_offset_reset.clone(),
            ),
            ("enable.auto.commit".to_string(), "false".to_string()),
            (
                "session.timeout.ms".to_string(),
                self.session_timeout.as_millis().to_string(),
            ),
            (
                "client.id".to_string(),
                format!("k8s-cd-deployer-{}", self.group_id),
            ),
            (
                "security.protocol".to_string(),
                self.security_protocol.as_str().to_string(),
            ),
        ];

        if let Some(sasl) = &self.sasl_config {
            settings.push((
                "sasl.mechanism".to_string(),
                sasl.mechanism.as_str().to_string(),
            ));
            settings.push(("sasl.username".to_string(), sasl.username.clone()));
            settings.push(("sasl.password".to_string(), sasl.password.clone()));
        }

        if let Some(ssl) = &self.ssl_config {
            settings.push(("ssl.ca.location".to_string(), ssl.ca_location.clone()));
        }

        settings
    }
}
