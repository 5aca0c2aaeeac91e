//! Route handlers for the HTTP facade.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, info, warn};

use super::ApiState;
use crate::error::DeployerError;
use crate::inventory::Workload;
use crate::orchestrator::EventOutcome;

fn bad_gateway(e: DeployerError) -> Response {
    warn!(error = %e, "Cluster listing failed");
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({ "error": e.to_string() })),
    )
        .into_response()
}

/// GET /deployments/:namespace
pub async fn list_pods(
    State(state): State<ApiState>,
    Path(namespace): Path<String>,
) -> Response {
    match state.query.list_pods(&namespace).await {
        Ok(pods) => Json(pods).into_response(),
        Err(e) => bad_gateway(e),
    }
}

/// GET /deployments/all
pub async fn list_summaries(State(state): State<ApiState>) -> Response {
    match state.query.list_deployments().await {
        Ok(deployments) => {
            let summaries: Vec<Workload> = deployments
                .iter()
                .filter_map(Workload::from_deployment)
                .collect();
            Json(summaries).into_response()
        }
        Err(e) => bad_gateway(e),
    }
}

/// GET /deployments/raw
pub async fn list_raw(State(state): State<ApiState>) -> Response {
    match state.query.list_deployments().await {
        Ok(deployments) => Json(deployments).into_response(),
        Err(e) => bad_gateway(e),
    }
}

/// GET /deployments/restart/*tag
///
/// Accepts immediately; the restart runs in the background and its result
/// is only logged.
pub async fn trigger_restart(
    State(state): State<ApiState>,
    Path(tag): Path<String>,
) -> impl IntoResponse {
    info!(tag = %tag, "Manual restart requested");

    let orchestrator = state.orchestrator.clone();
    let background_tag = tag.clone();
    tokio::spawn(async move {
        match orchestrator.restart_matching(&background_tag).await {
            Ok(EventOutcome::Processed(report)) => info!(
                tag = %background_tag,
                restarted = report.restarted().len(),
                failed = report.failed().len(),
                "Manual restart finished"
            ),
            Ok(EventOutcome::Ignored(reason)) => {
                info!(tag = %background_tag, ?reason, "Manual restart ignored")
            }
            Err(e) => error!(tag = %background_tag, error = %e, "Manual restart failed"),
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({ "status": "accepted", "tag": tag })),
    )
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
