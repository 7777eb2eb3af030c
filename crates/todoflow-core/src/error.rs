use std::fmt;
use thiserror::Error;

/// Classification of every failure the framework can report.
///
/// Labels are stable snake_case strings suitable for span attributes,
/// log fields and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Flow constructed with a missing or invalid name
    InvalidConfiguration,
    /// Flow constructed without a required collaborator
    MissingDependency,
    /// Input rejected before the step ran
    ValidationFailure,
    /// Business step raised a domain error
    StepFailure,
    /// Transaction or data operation failed
    PersistenceFailure,
    /// Invocation cancelled by the caller
    Cancelled,
    /// Bootstrap task failed
    StartupTaskFailure,
    /// Application-started listener failed
    ListenerFailure,
}

impl FailureKind {
    /// Returns a short stable label for use in logs and span attributes.
    pub fn as_label(&self) -> &'static str {
        match self {
            FailureKind::InvalidConfiguration => "invalid_configuration",
            FailureKind::MissingDependency => "missing_dependency",
            FailureKind::ValidationFailure => "validation_failure",
            FailureKind::StepFailure => "step_failure",
            FailureKind::PersistenceFailure => "persistence_failure",
            FailureKind::Cancelled => "cancelled",
            FailureKind::StartupTaskFailure => "startup_task_failure",
            FailureKind::ListenerFailure => "listener_failure",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// A single rejected input field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Name of the offending field
    pub field: String,
    /// Human-readable reason
    pub message: String,
}

/// Collected validation failures for one input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty error collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a collection holding exactly one field error
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a field error
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Whether no errors were recorded
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Recorded errors in insertion order
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// `Ok(())` when empty, otherwise `Err(self)`
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&rendered.join("; "))
    }
}

/// Domain failure raised by a business step.
///
/// The `code` is the step's own classification and is surfaced unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct StepError {
    /// Step-specific classification, e.g. `not_found`
    pub code: String,
    /// Human-readable detail
    pub message: String,
}

impl StepError {
    /// Create a step error with an arbitrary code
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The requested entity does not exist (or is not visible to the principal)
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    /// The principal may not perform the operation
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("forbidden", message)
    }

    /// The operation requires an authenticated principal
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new("unauthenticated", message)
    }
}

/// Failures of the transaction contract or the underlying storage
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// Transaction could not be started
    #[error("failed to begin transaction: {0}")]
    Begin(String),

    /// Transaction could not be committed
    #[error("failed to commit transaction: {0}")]
    Commit(String),

    /// Transaction could not be rolled back
    #[error("failed to roll back transaction: {0}")]
    Rollback(String),

    /// A data operation failed
    #[error("storage error: {0}")]
    Storage(String),
}

/// Error returned by flow construction and execution
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// Flow constructed with a missing or invalid name
    #[error("invalid flow configuration: {0}")]
    InvalidConfiguration(String),

    /// Flow constructed without a required collaborator
    #[error("missing flow dependency: {0}")]
    MissingDependency(&'static str),

    /// Input failed validation
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Business step failed
    #[error("step failed: {0}")]
    Step(#[from] StepError),

    /// Commit or data operation failed
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Invocation cancelled before completion
    #[error("flow execution cancelled")]
    Cancelled,
}

impl FlowError {
    /// Taxonomy kind of this error
    pub fn kind(&self) -> FailureKind {
        match self {
            FlowError::InvalidConfiguration(_) => FailureKind::InvalidConfiguration,
            FlowError::MissingDependency(_) => FailureKind::MissingDependency,
            FlowError::Validation(_) => FailureKind::ValidationFailure,
            FlowError::Step(_) => FailureKind::StepFailure,
            FlowError::Persistence(_) => FailureKind::PersistenceFailure,
            FlowError::Cancelled => FailureKind::Cancelled,
        }
    }
}

impl From<ValidationErrors> for FlowError {
    fn from(errors: ValidationErrors) -> Self {
        FlowError::Validation(errors)
    }
}

/// Error reported by a startup task or an application-started listener
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TaskError(pub String);

impl TaskError {
    /// Create a task error from any message
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        TaskError(message)
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        TaskError(message.to_string())
    }
}

impl From<FlowError> for TaskError {
    fn from(err: FlowError) -> Self {
        TaskError(err.to_string())
    }
}

impl From<PersistenceError> for TaskError {
    fn from(err: PersistenceError) -> Self {
        TaskError(err.to_string())
    }
}

/// Errors raised while bootstrapping the process
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    /// A startup task failed; the process must not serve traffic
    #[error("startup task '{task}' failed: {reason}")]
    StartupTaskFailure {
        /// Name of the failing task
        task: String,
        /// Failure detail
        reason: String,
    },

    /// An application-started listener failed
    #[error("application-started listener '{listener}' failed: {reason}")]
    ListenerFailure {
        /// Name of the failing listener
        listener: String,
        /// Failure detail
        reason: String,
    },

    /// The startup executor was already run in this process
    #[error("startup tasks have already been executed")]
    AlreadyExecuted,
}

impl BootstrapError {
    /// Taxonomy kind of this error
    pub fn kind(&self) -> FailureKind {
        match self {
            BootstrapError::StartupTaskFailure { .. } | BootstrapError::AlreadyExecuted => {
                FailureKind::StartupTaskFailure
            }
            BootstrapError::ListenerFailure { .. } => FailureKind::ListenerFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = vec![
            (
                FlowError::InvalidConfiguration("flow name must not be empty".to_string()),
                "invalid flow configuration: flow name must not be empty",
            ),
            (
                FlowError::MissingDependency("tracer"),
                "missing flow dependency: tracer",
            ),
            (
                FlowError::Validation(ValidationErrors::single("title", "must not be empty")),
                "validation failed: title: must not be empty",
            ),
            (
                FlowError::Step(StepError::not_found("todo item 42")),
                "step failed: not_found: todo item 42",
            ),
            (
                FlowError::Persistence(PersistenceError::Commit("disk full".to_string())),
                "failed to commit transaction: disk full",
            ),
            (FlowError::Cancelled, "flow execution cancelled"),
        ];

        for (error, expected_msg) in errors {
            assert_eq!(error.to_string(), expected_msg);
        }
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            FlowError::InvalidConfiguration(String::new()).kind(),
            FailureKind::InvalidConfiguration
        );
        assert_eq!(
            FlowError::MissingDependency("step").kind(),
            FailureKind::MissingDependency
        );
        assert_eq!(
            FlowError::Validation(ValidationErrors::new()).kind(),
            FailureKind::ValidationFailure
        );
        assert_eq!(
            FlowError::from(StepError::forbidden("no")).kind(),
            FailureKind::StepFailure
        );
        assert_eq!(
            FlowError::from(PersistenceError::Storage("io".into())).kind(),
            FailureKind::PersistenceFailure
        );
        assert_eq!(FlowError::Cancelled.kind(), FailureKind::Cancelled);
        assert_eq!(
            BootstrapError::AlreadyExecuted.kind(),
            FailureKind::StartupTaskFailure
        );
        assert_eq!(
            BootstrapError::ListenerFailure {
                listener: "x".into(),
                reason: "y".into()
            }
            .kind(),
            FailureKind::ListenerFailure
        );
    }

    #[test]
    fn test_labels_are_snake_case() {
        let kinds = [
            FailureKind::InvalidConfiguration,
            FailureKind::MissingDependency,
            FailureKind::ValidationFailure,
            FailureKind::StepFailure,
            FailureKind::PersistenceFailure,
            FailureKind::Cancelled,
            FailureKind::StartupTaskFailure,
            FailureKind::ListenerFailure,
        ];

        for kind in kinds {
            let label = kind.as_label();
            assert!(label.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
            assert_eq!(kind.to_string(), label);
        }
    }

    #[test]
    fn test_validation_errors_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut errors = ValidationErrors::new();
        errors.add("title", "must not be empty");
        errors.add("description", "too long");
        let err = errors.into_result().unwrap_err();
        assert_eq!(err.errors().len(), 2);
        assert_eq!(err.errors()[1].field, "description");
    }

    #[test]
    fn test_step_error_preserves_code() {
        let err: FlowError = StepError::new("invalid_credentials", "bad password").into();
        match err {
            FlowError::Step(step) => {
                assert_eq!(step.code, "invalid_credentials");
                assert_eq!(step.message, "bad password");
            }
            _ => panic!("Expected Step variant"),
        }
    }

    #[test]
    fn test_task_error_from_flow_error() {
        let err: TaskError = FlowError::Cancelled.into();
        assert_eq!(err.to_string(), "flow execution cancelled");
    }
}
