//! Structured logging module using tracing.
//!
//! JSON output is meant for log aggregation; the pretty format is for local
//! development. `RUST_LOG` overrides the configured filter.

use anyhow::{bail, Context};
use once_cell::sync::OnceCell;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

use crate::MonitoringConfig;

static LOGGING: OnceCell<()> = OnceCell::new();

/// Initialize structured logging. Fails if called twice.
pub fn init_logging(config: &MonitoringConfig) -> anyhow::Result<()> {
    if LOGGING.get().is_some() {
        bail!("Logging already initialized");
    }

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .with_context(|| format!("Invalid log filter '{}'", config.log_filter))?;

    let fmt_layer = if config.json_logs {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .context("Failed to set global default subscriber")?;

    let _ = LOGGING.set(());

    info!(
        service_name = %config.service_name,
        log_format = if config.json_logs { "json" } else { "pretty" },
        "Logging initialized"
    );

    Ok(())
}

/// Logs the error side of a result as one structured event.
///
/// The error lands in an `error` field rather than in the message, so JSON
/// output can be filtered on it.
pub trait LogExt<T, E> {
    /// Emit an `error` event for an `Err`, then hand the result back unchanged
    fn log_err(self, message: &'static str) -> Result<T, E>;

    /// Emit a `warn` event for an `Err` and carry on without a value
    fn warn_err(self, message: &'static str) -> Option<T>;
}

impl<T, E: std::fmt::Display> LogExt<T, E> for Result<T, E> {
    fn log_err(self, message: &'static str) -> Result<T, E> {
        if let Err(e) = &self {
            error!(error = %e, "{}", message);
        }
        self
    }

    fn warn_err(self, message: &'static str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "{}", message);
                None
            }
        }
    }
}

/// Initializes test tracing. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_target(false)
        .with_test_writer()
        .try_init();
}
