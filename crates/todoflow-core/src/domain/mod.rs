/// Per-invocation execution context
pub mod context;

/// Tracing sink contract and span guard
pub mod telemetry;

/// Transaction contract
pub mod transaction;

/// Input validation hook
pub mod validation;
