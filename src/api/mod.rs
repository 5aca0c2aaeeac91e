//! HTTP facade over the cluster inventory.
//!
//! Read-only passthroughs plus a manual restart trigger. No decisioning
//! happens here; the trigger enters the same orchestrator path as events.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/deployments/:namespace` | Raw pods of one namespace |
//! | GET | `/deployments/all` | Deployment summaries across namespaces |
//! | GET | `/deployments/raw` | Raw deployments across namespaces |
//! | GET | `/deployments/restart/*tag` | Restart workloads running `tag` |
//! | GET | `/health` | Liveness |

pub mod handlers;

use crate::error::Result;
use crate::inventory::ClusterQuery;
use crate::orchestrator::RestartOrchestrator;
use anyhow::Context;
use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub query: Arc<dyn ClusterQuery>,
    pub orchestrator: Arc<RestartOrchestrator>,
}

/// Build the facade router.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/deployments/all", get(handlers::list_summaries))
        .route("/deployments/raw", get(handlers::list_raw))
        .route("/deployments/restart/*tag", get(handlers::trigger_restart))
        .route("/deployments/:namespace", get(handlers::list_pods))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Bind the facade listener.
///
/// Call before the consumer starts; a bind failure is a startup error.
///
/// # Errors
///
/// Returns error if the address is in use or not permitted.
pub async fn bind(address: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind HTTP facade on {}", address))?;
    info!(address = %listener.local_addr()?, "HTTP facade listening");
    Ok(listener)
}

/// Serve the facade on a bound listener until `shutdown` resolves.
///
/// # Errors
///
/// Returns error if the server fails.
pub async fn serve<F>(listener: TcpListener, state: ApiState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP facade stopped");
    Ok(())
}
