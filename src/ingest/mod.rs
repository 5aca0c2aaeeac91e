//! Event ingestion
//!
//! Turns transport messages into restart decisions. Each payload is decoded
//! into an [`ImageUpdateEvent`], handed to the [`RestartOrchestrator`], and
//! answered with a [`Disposition`] the transport adapter must honor:
//!
//! | Outcome | Disposition |
//! |---|---|
//! | payload does not decode | `Drop` (settled, never retried) |
//! | event ignored or processed, even with failed restarts | `Ack` |
//! | workload enumeration failed | `Nack` (left for redelivery) |
//!
//! # Modules
//!
//! - [`config`]: Kafka consumer configuration
//! - [`kafka`]: Kafka transport adapter

pub mod config;
pub mod kafka;

use crate::event::ImageUpdateEvent;
use crate::metrics;
use crate::orchestrator::{EventOutcome, RestartOrchestrator};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub use self::config::KafkaConsumerConfig;
pub use self::kafka::EventConsumer;

/// What the transport should do with a message after handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Processed; remove from the redelivery set
    Ack,
    /// Not processed; leave for redelivery
    Nack,
    /// Unprocessable; remove from the redelivery set without processing
    Drop,
}

impl Disposition {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ack => "ack",
            Self::Nack => "nack",
            Self::Drop => "drop",
        }
    }

    /// Whether the message is settled and must not be delivered again
    pub fn settles(&self) -> bool {
        !matches!(self, Self::Nack)
    }
}

/// Per-message handler invoked by a transport adapter.
///
/// Implementations must tolerate concurrent calls.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle one raw payload and decide its disposition.
    async fn handle(&self, payload: &[u8]) -> Disposition;
}

/// Decodes image update events and dispatches them to the orchestrator.
pub struct ImageEventHandler {
    orchestrator: Arc<RestartOrchestrator>,
    include_payload: bool,
}

impl ImageEventHandler {
    /// Create a handler over a shared orchestrator.
    pub fn new(orchestrator: Arc<RestartOrchestrator>) -> Self {
        Self {
            orchestrator,
            include_payload: false,
        }
    }

    /// Log raw payloads of undecodable messages.
    pub fn with_payload_logging(mut self, include_payload: bool) -> Self {
        self.include_payload = include_payload;
        self
    }

    async fn dispatch(&self, event: ImageUpdateEvent) -> Disposition {
        match self.orchestrator.handle(&event).await {
            Ok(EventOutcome::Ignored(reason)) => {
                debug!(tag = %event.tag, ?reason, "Event ignored");
                Disposition::Ack
            }
            Ok(EventOutcome::Processed(report)) => {
                if !report.failed().is_empty() {
                    warn!(
                        tag = %event.tag,
                        failed = report.failed().len(),
                        "Event processed with failed restarts"
                    );
                }
                Disposition::Ack
            }
            Err(e) if e.is_retryable() => {
                warn!(tag = %event.tag, error = %e, "Leaving event for redelivery");
                Disposition::Nack
            }
            Err(e) => {
                error!(tag = %event.tag, error = %e, "Event handling failed");
                Disposition::Ack
            }
        }
    }
}

#[async_trait]
impl MessageHandler for ImageEventHandler {
    async fn handle(&self, payload: &[u8]) -> Disposition {
        let disposition = match ImageUpdateEvent::decode(payload) {
            Ok(event) => self.dispatch(event).await,
            Err(e) => {
                warn!(error = %e, bytes = payload.len(), "Dropping undecodable message");
                if self.include_payload {
                    debug!(payload = %String::from_utf8_lossy(payload), "Undecodable payload");
                }
                metrics::record_undecodable();
                Disposition::Drop
            }
        };

        metrics::record_message(disposition);
        disposition
    }
}
