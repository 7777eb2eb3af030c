//!
//! Todoflow Server - application host for the Todoflow service
//!
//! Wires the todo flows, runs startup tasks, serves the health endpoint and
//! notifies application-started listeners.

use todoflow_monitoring::LogExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// API module
pub mod api;

/// Configuration module
pub mod config;

/// Error module
pub mod error;

/// Server module
pub mod server;

// Re-export key types
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{RunningServer, TodoflowServer};

/// Service name used in logs, spans and deployment records
pub const SERVICE_NAME: &str = "todoflow";

/// Run until Ctrl-C
pub async fn run(config: ServerConfig) -> ServerResult<()> {
    let shutdown = CancellationToken::new();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c()
            .await
            .warn_err("Failed to listen for shutdown signal")
            .is_some()
        {
            info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    let server = TodoflowServer::new(config)?;
    let running = server.start(shutdown).await?;
    running.wait().await
}
