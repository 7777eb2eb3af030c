//! Best-effort fan-out once the host is live
//!
//! Unlike [`StartupTaskExecutor`](super::startup::StartupTaskExecutor), a
//! failing listener never stops the others and never affects serving.

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::startup::panic_message;
use crate::error::{BootstrapError, TaskError};

/// Hook invoked after the host started accepting connections
#[async_trait]
pub trait ApplicationStartedListener: Send + Sync {
    /// Stable name used in logs
    fn name(&self) -> &str;

    async fn on_application_started(&self) -> Result<(), TaskError>;
}

/// What happened during a notification round
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationReport {
    /// Listeners that completed successfully, in order
    pub notified: Vec<String>,
    /// One entry per failed listener
    pub failures: Vec<BootstrapError>,
}

/// Invokes application-started listeners in registration order
#[derive(Default)]
pub struct ApplicationStartedNotifier {
    listeners: Vec<Arc<dyn ApplicationStartedListener>>,
    notified: AtomicBool,
}

impl ApplicationStartedNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Arc<dyn ApplicationStartedListener>) -> &mut Self {
        self.listeners.push(listener);
        self
    }

    pub fn with_listener(mut self, listener: impl ApplicationStartedListener + 'static) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Fan out to every listener. Never fails; fires at most once.
    pub async fn notify(&self) -> NotificationReport {
        let mut report = NotificationReport::default();

        if self.notified.swap(true, Ordering::SeqCst) {
            warn!("Application-started listeners already notified, ignoring");
            return report;
        }

        for listener in &self.listeners {
            let name = listener.name().to_string();
            let result = match AssertUnwindSafe(listener.on_application_started())
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(panic) => Err(TaskError::new(panic_message(panic.as_ref()))),
            };

            match result {
                Ok(()) => {
                    debug!(listener = %name, "Application-started listener completed");
                    report.notified.push(name);
                }
                Err(err) => {
                    error!(listener = %name, error = %err, "Application-started listener failed");
                    report.failures.push(BootstrapError::ListenerFailure {
                        listener: name,
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            notified = report.notified.len(),
            failed = report.failures.len(),
            "Application-started notification finished"
        );
        report
    }
}
