//! API module for the Todoflow Server

use axum::{routing::get, Router};
use std::sync::Arc;
use todoflow_todo::{DeploymentLog, TodoFlows, TodoStore};

pub mod health;

/// Shared state handed to handlers
#[derive(Clone)]
pub struct AppState {
    pub flows: Arc<TodoFlows>,
    pub store: Arc<TodoStore>,
    pub deployments: Arc<DeploymentLog>,
    pub environment: String,
}

/// Build the router for API endpoints
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .with_state(state)
}
