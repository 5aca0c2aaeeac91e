//! Long-running deployer: event consumer plus optional HTTP facade.

use crate::api::{self, ApiState};
use crate::config::{Config, ServerConfig};
use crate::error::Result;
use crate::ingest::{EventConsumer, ImageEventHandler, KafkaConsumerConfig};
use crate::inventory::KubeInventory;
use crate::metrics;
use crate::orchestrator::RestartOrchestrator;
use crate::policy::RestartPolicy;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Run the deployer until a shutdown signal arrives.
///
/// # Arguments
///
/// * `config` - Validated configuration
/// * `dry_run` - Report matching workloads without restarting them
/// * `no_server` - Skip the HTTP facade even if enabled in config
///
/// # Errors
///
/// Returns error if the cluster client, the consumer or the HTTP listener
/// cannot be set up.
pub async fn run_deployer(config: Config, dry_run: bool, no_server: bool) -> Result<()> {
    let policy = RestartPolicy::from_config(&config.policy)?;
    info!(policy = %policy.summary(), dry_run, "Starting deployer");

    if dry_run {
        warn!("Dry-run mode: no workload will be restarted");
    }

    metrics::init_exporter(&config.metrics)?;

    let listener = bind_facade(&config.server, no_server).await?;

    let inventory = Arc::new(KubeInventory::try_default(config.cluster.request_timeout()).await?);
    let orchestrator =
        Arc::new(RestartOrchestrator::new(policy, inventory.clone()).with_dry_run(dry_run));

    let handler = Arc::new(
        ImageEventHandler::new(orchestrator.clone())
            .with_payload_logging(config.logging.include_payload),
    );
    let consumer = Arc::new(EventConsumer::new(KafkaConsumerConfig::from_settings(
        &config.kafka,
    )?)?);

    let shutdown = CancellationToken::new();

    let server = listener.map(|listener| {
        let state = ApiState {
            query: inventory.clone(),
            orchestrator: orchestrator.clone(),
        };
        let token = shutdown.clone();
        let failure_token = shutdown.clone();
        let failure_consumer = consumer.clone();
        tokio::spawn(async move {
            let served = api::serve(listener, state, async move { token.cancelled().await }).await;
            if let Err(e) = &served {
                error!(error = %e, "HTTP facade failed, shutting down");
                failure_token.cancel();
                failure_consumer.stop();
            }
            served
        })
    });

    let signal_token = shutdown.clone();
    let signal_consumer = consumer.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_token.cancel();
        signal_consumer.stop();
    });

    let consumed = consumer.run(handler).await;
    shutdown.cancel();

    if let Some(server) = server {
        server
            .await
            .map_err(|e| anyhow::anyhow!("HTTP facade task panicked: {}", e))??;
    }

    consumed?;
    info!("Deployer stopped");
    Ok(())
}

/// Bind the HTTP facade unless it is disabled.
async fn bind_facade(config: &ServerConfig, no_server: bool) -> Result<Option<TcpListener>> {
    if !config.enabled || no_server {
        info!("HTTP facade disabled");
        return Ok(None);
    }

    let address: SocketAddr = config.bind_address.parse()?;
    Ok(Some(api::bind(address).await?))
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
