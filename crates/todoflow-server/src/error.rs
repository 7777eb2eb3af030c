//! Error types for the Todoflow Server

use thiserror::Error;
use todoflow_core::{BootstrapError, FlowError};

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A startup task failed; the server never started listening
    #[error("Startup aborted: {0}")]
    Bootstrap(#[from] BootstrapError),

    /// A flow could not be constructed
    #[error("Flow setup failed: {0}")]
    FlowSetup(#[from] FlowError),

    /// Listener or socket failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error
    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;
