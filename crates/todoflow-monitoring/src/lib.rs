//! Monitoring module for the Todoflow service.
//!
//! Owns the process-wide log subscriber and the [`TracingFlowTracer`] that
//! turns flow spans into `tracing` spans.

use tracing::info;

pub mod logging;
pub mod telemetry;

pub use logging::{init_logging, init_test_tracing, LogExt};
pub use telemetry::TracingFlowTracer;

/// Configuration for initializing the monitoring system
#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    /// Service name attached to flow spans
    pub service_name: String,
    /// Log level filter (e.g., "info,todoflow=debug")
    pub log_filter: String,
    /// JSON output instead of the human-readable format
    pub json_logs: bool,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "todoflow".to_string(),
            log_filter: "info".to_string(),
            json_logs: true,
            environment: "development".to_string(),
        }
    }
}

/// Initialize monitoring system
pub fn init(config: &MonitoringConfig) -> anyhow::Result<()> {
    logging::init_logging(config)?;

    info!(
        service_name = %config.service_name,
        environment = %config.environment,
        "Monitoring initialized"
    );

    Ok(())
}

/// Shutdown the monitoring system
pub fn shutdown() {
    info!("Shutting down monitoring system");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MonitoringConfig::default();
        assert_eq!(config.service_name, "todoflow");
        assert_eq!(config.log_filter, "info");
        assert!(config.json_logs);
    }
}
