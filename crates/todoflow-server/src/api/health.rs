//! Health check endpoint for the Todoflow Server

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use todoflow_todo::CURRENT_SCHEMA_VERSION;
use tracing::debug;

use super::AppState;

/// Health check handler
///
/// Reports `UP` once the store schema is current, `DOWN` otherwise.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");

    let schema_version = state.store.schema_version().await;
    let store_status = if schema_version >= CURRENT_SCHEMA_VERSION {
        "UP"
    } else {
        "DOWN"
    };

    let started_at = state
        .deployments
        .entries()
        .last()
        .map(|record| record.started_at.to_rfc3339());

    let response = json!({
        "status": store_status,
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.environment,
        "startedAt": started_at,
        "flows": state.flows.names(),
        "dependencies": {
            "todoStore": {
                "status": store_status,
                "schemaVersion": schema_version,
            },
        },
    });

    let status = if store_status == "UP" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
