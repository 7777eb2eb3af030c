use anyhow::{Context, Result};
use todoflow_server::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment variables
    let config = ServerConfig::load().context("Failed to load configuration")?;

    todoflow_monitoring::init(&config.monitoring_config())
        .context("Failed to initialize monitoring")?;
    config.log_loaded();

    let result = todoflow_server::run(config).await.context("Server error");

    todoflow_monitoring::shutdown();
    result
}
