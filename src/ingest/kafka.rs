//! Kafka transport adapter.
//!
//! Owns the consumer connection with an explicit start/stop lifecycle and
//! honors the [`Disposition`] each message handler returns:
//!
//! - `Ack` / `Drop`: the message offset is committed
//! - `Nack`: nothing is committed; after the redelivery delay the partition
//!   is rewound to the message so it is delivered again
//!
//! Messages are handled one at a time per consumer.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use k8s_cd_deployer::ingest::{Disposition, EventConsumer, KafkaConsumerConfig, MessageHandler};
//!
//! struct Printer;
//!
//! #[async_trait::async_trait]
//! impl MessageHandler for Printer {
//!     async fn handle(&self, payload: &[u8]) -> Disposition {
//!         println!("{}", String::from_utf8_lossy(payload));
//!         Disposition::Ack
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = KafkaConsumerConfig::new("localhost:9092", "gcr", "gcr-pull");
//! let consumer = EventConsumer::new(config)?;
//! consumer.run(Arc::new(Printer)).await?;
//! # Ok(())
//! # }
//! ```

use super::config::KafkaConsumerConfig;
use super::{Disposition, MessageHandler};
use crate::error::DeployerError;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{Message, OwnedMessage};
use rdkafka::{Offset, TopicPartitionList};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

const SEEK_TIMEOUT: Duration = Duration::from_secs(10);
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Kafka consumer for image update notifications.
pub struct EventConsumer {
    config: KafkaConsumerConfig,
    consumer: StreamConsumer,
    shutdown: CancellationToken,
    running: Arc<AtomicBool>,
}

impl EventConsumer {
    /// Create a consumer from configuration.
    ///
    /// No connection is made until [`EventConsumer::run`] subscribes.
    ///
    /// # Errors
    ///
    /// Returns `DeployerError::Consumer` if librdkafka rejects the settings.
    pub fn new(config: KafkaConsumerConfig) -> Result<Self, DeployerError> {
        info!(
            brokers = %config.brokers,
            topic = %config.topic,
            subscription = %config.group_id,
            security_protocol = %config.security_protocol.as_str(),
            "Creating event consumer"
        );

        let mut client_config = ClientConfig::new();
        for (key, value) in config.client_settings() {
            client_config.set(key, value);
        }

        let consumer: StreamConsumer = client_config
            .create()
            .map_err(|e| DeployerError::Consumer(format!("Failed to create consumer: {}", e)))?;

        Ok(Self {
            config,
            consumer,
            shutdown: CancellationToken::new(),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Returns the topic this consumer reads.
    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    /// Returns the subscription (consumer group) identifier.
    pub fn subscription(&self) -> &str {
        &self.config.group_id
    }

    /// Checks if the consumer loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops the consumer loop.
    ///
    /// The message in flight, if any, finishes handling first.
    pub fn stop(&self) {
        info!(subscription = %self.config.group_id, "Stopping consumer");
        self.shutdown.cancel();
    }

    /// Runs the consumer until [`EventConsumer::stop`] is called.
    ///
    /// # Errors
    ///
    /// Returns `DeployerError::Consumer` if the topic subscription fails.
    /// Receive errors are logged and the loop continues.
    pub async fn run<H>(&self, handler: Arc<H>) -> Result<(), DeployerError>
    where
        H: MessageHandler + ?Sized,
    {
        self.consumer
            .subscribe(&[self.config.topic.as_str()])
            .map_err(|e| DeployerError::Consumer(format!("Failed to subscribe: {}", e)))?;

        self.running.store(true, Ordering::SeqCst);
        info!(
            topic = %self.config.topic,
            subscription = %self.config.group_id,
            "Consumer started"
        );

        loop {
            let received = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                received = self.consumer.recv() => received.map(|m| m.detach()),
            };

            match received {
                Ok(message) => {
                    let span = info_span!(
                        "message",
                        topic = %message.topic(),
                        partition = message.partition(),
                        offset = message.offset(),
                    );
                    self.dispatch(message, handler.as_ref())
                        .instrument(span)
                        .await;
                }
                Err(e) => {
                    warn!(error = %e, "Kafka receive error");
                    tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!(subscription = %self.config.group_id, "Consumer stopped");
        Ok(())
    }

    async fn dispatch<H>(&self, message: OwnedMessage, handler: &H)
    where
        H: MessageHandler + ?Sized,
    {
        let payload = message.payload().unwrap_or_default();
        debug!(bytes = payload.len(), "Received message");

        let disposition = handler.handle(payload).await;
        debug!(disposition = disposition.as_str(), "Message handled");

        match disposition {
            Disposition::Ack | Disposition::Drop => self.commit(&message),
            Disposition::Nack => self.redeliver(&message).await,
        }
    }

    fn commit(&self, message: &OwnedMessage) {
        let mut partitions = TopicPartitionList::new();
        let result = partitions
            .add_partition_offset(
                message.topic(),
                message.partition(),
                Offset::Offset(message.offset() + 1),
            )
            .and_then(|_| self.consumer.commit(&partitions, CommitMode::Async));

        if let Err(e) = result {
            // An uncommitted offset only means the message may come back.
            error!(error = %e, "Failed to commit offset");
        }
    }

    async fn redeliver(&self, message: &OwnedMessage) {
        tokio::select! {
            _ = self.shutdown.cancelled() => return,
            _ = tokio::time::sleep(self.config.redelivery_delay) => {}
        }

        if let Err(e) = self.consumer.seek(
            message.topic(),
            message.partition(),
            Offset::Offset(message.offset()),
            SEEK_TIMEOUT,
        ) {
            error!(error = %e, "Failed to rewind partition for redelivery");
        }
    }
}
