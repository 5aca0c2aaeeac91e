//! Deployer metrics
//!
//! Thin wrappers over the `metrics` facade. Without an installed recorder
//! every call is a no-op; the `prometheus` feature adds a scrape endpoint.
//!
//! # Metrics
//!
//! - `deployer_messages_total`: Counter of consumed messages by disposition
//! - `deployer_messages_undecodable_total`: Counter of payloads dropped as undecodable
//! - `deployer_restarts_total`: Counter of per-workload outcomes
//! - `deployer_inventory_failures_total`: Counter of failed enumerations
//! - `deployer_handle_duration_seconds`: Histogram of enumerate-and-restart time,
//!   labelled `ok` or `inventory_unavailable`

use crate::config::MetricsConfig;
use crate::ingest::Disposition;
use crate::orchestrator::RestartOutcome;
use metrics::{histogram, increment_counter};
use std::time::Duration;

/// Record the disposition chosen for a consumed message
pub fn record_message(disposition: Disposition) {
    increment_counter!("deployer_messages_total", "disposition" => disposition.as_str());
}

/// Record a payload that could not be decoded.
///
/// Kept separate from the disposition counter so a producer/consumer schema
/// mismatch shows up on its own.
pub fn record_undecodable() {
    increment_counter!("deployer_messages_undecodable_total");
}

/// Record the outcome for one enumerated workload
pub fn record_restart(outcome: &RestartOutcome) {
    increment_counter!("deployer_restarts_total", "outcome" => outcome.as_str());
}

/// Record a failed workload enumeration
pub fn record_inventory_failure() {
    increment_counter!("deployer_inventory_failures_total");
}

/// Record how long enumeration plus restarts took for one tag.
///
/// Failed enumerations are recorded too, so timeouts show up as latency.
pub fn record_handle_duration(elapsed: Duration, succeeded: bool) {
    let result = if succeeded {
        "ok"
    } else {
        "inventory_unavailable"
    };
    histogram!("deployer_handle_duration_seconds", elapsed.as_secs_f64(), "result" => result);
}

/// Start the configured exporter, if any.
///
/// # Errors
///
/// Returns error if the exporter cannot be installed.
pub fn init_exporter(config: &MetricsConfig) -> crate::error::Result<()> {
    match config.listen_address.as_deref() {
        #[cfg(feature = "prometheus")]
        Some(address) => install_prometheus(address),
        #[cfg(not(feature = "prometheus"))]
        Some(address) => {
            tracing::warn!(
                address = %address,
                "metrics.listen_address is set but the prometheus feature is disabled"
            );
            Ok(())
        }
        None => Ok(()),
    }
}

/// Install the Prometheus recorder with a scrape listener on `address`.
///
/// # Errors
///
/// Returns error if the address does not parse or the recorder cannot be installed.
#[cfg(feature = "prometheus")]
pub fn install_prometheus(address: &str) -> crate::error::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let address: std::net::SocketAddr = address.parse()?;
    PrometheusBuilder::new()
        .with_http_listener(address)
        .install()?;

    tracing::info!(address = %address, "Prometheus exporter listening");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_message(Disposition::Ack);
        record_message(Disposition::Nack);
        record_message(Disposition::Drop);
        record_undecodable();
        record_restart(&RestartOutcome::Restarted);
        record_restart(&RestartOutcome::Failed("boom".to_string()));
        record_inventory_failure();
        record_handle_duration(Duration::from_millis(12), true);
        record_handle_duration(Duration::from_secs(10), false);
    }

    #[test]
    fn test_init_exporter_without_address_is_noop() {
        assert!(init_exporter(&MetricsConfig::default()).is_ok());
    }
}
