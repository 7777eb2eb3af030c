//!
//! Todoflow Core - flow execution framework for the Todoflow service
//!
//! Every business use-case runs as a [`Flow`]: a step wrapped with span
//! creation, conversation correlation, principal context, input validation,
//! failure classification and an optional transaction boundary. The
//! [`StartupTaskExecutor`] and [`ApplicationStartedNotifier`] sequence the
//! work that happens around process start.

#![forbid(unsafe_code)]

/// Domain layer - context, tracing and transaction contracts
pub mod domain;

/// Application layer - flows, boundaries and bootstrap orchestration
pub mod application;

/// Core types
pub mod types;

/// Error types
pub mod error;

/// Test doubles
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export key types
pub use error::{
    BootstrapError, FailureKind, FieldError, FlowError, PersistenceError, StepError, TaskError,
    ValidationErrors,
};
pub use types::{ConversationId, FlowName, Principal};

pub use domain::context::{FlowExecutionContext, Invocation};
pub use domain::telemetry::{FlowSpan, FlowTracer, SpanAttributes, SpanGuard, SpanOutcome};
pub use domain::transaction::{Transaction, TransactionProvider};
pub use domain::validation::Validate;

pub use application::boundary::{
    ExecutionBoundary, NoTransaction, NonTransactional, Transactional,
};
pub use application::flow::{ExecuteFlow, Flow, FlowBuilder, FlowStep};
pub use application::notifier::{
    ApplicationStartedListener, ApplicationStartedNotifier, NotificationReport,
};
pub use application::startup::{StartupReport, StartupTask, StartupTaskExecutor};

pub use tokio_util::sync::CancellationToken;
