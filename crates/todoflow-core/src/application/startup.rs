//! Fail-fast bootstrap sequencer
//!
//! [`StartupTaskExecutor`] runs registered [`StartupTask`]s strictly in
//! registration order before the host accepts traffic. The first failure
//! stops the sequence and is returned to the bootstrap caller, which must
//! abort startup. No retries happen here.

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, Instrument};

use crate::error::{BootstrapError, TaskError};

/// A unit of bootstrap work
#[async_trait]
pub trait StartupTask: Send + Sync {
    /// Stable name used in logs and errors
    fn name(&self) -> &str;

    /// Run the task to completion
    async fn execute(&self) -> Result<(), TaskError>;
}

/// Summary of a successful startup run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupReport {
    /// Names of the tasks that ran, in order
    pub completed: Vec<String>,
    /// Wall time of the whole sequence
    pub elapsed: Duration,
}

/// Runs startup tasks sequentially, at most once
#[derive(Default)]
pub struct StartupTaskExecutor {
    tasks: Vec<Arc<dyn StartupTask>>,
    executed: AtomicBool,
}

impl StartupTaskExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task; registration order is execution order
    pub fn register(&mut self, task: Arc<dyn StartupTask>) -> &mut Self {
        self.tasks.push(task);
        self
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_task(mut self, task: impl StartupTask + 'static) -> Self {
        self.tasks.push(Arc::new(task));
        self
    }

    /// Registered task names in execution order
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    /// Run every task in order, stopping at the first failure
    pub async fn execute(&self) -> Result<StartupReport, BootstrapError> {
        if self.executed.swap(true, Ordering::SeqCst) {
            return Err(BootstrapError::AlreadyExecuted);
        }

        let started = Instant::now();
        let mut completed = Vec::with_capacity(self.tasks.len());
        info!(tasks = self.tasks.len(), "Running startup tasks");

        for task in &self.tasks {
            let name = task.name().to_string();
            let task_started = Instant::now();

            let span = info_span!("startup_task", task = %name);
            let result = match AssertUnwindSafe(task.execute().instrument(span))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(panic) => Err(TaskError::new(panic_message(panic.as_ref()))),
            };

            match result {
                Ok(()) => {
                    info!(
                        task = %name,
                        elapsed_ms = task_started.elapsed().as_millis() as u64,
                        "Startup task completed"
                    );
                    completed.push(name);
                }
                Err(err) => {
                    error!(task = %name, error = %err, "Startup task failed, aborting startup");
                    return Err(BootstrapError::StartupTaskFailure {
                        task: name,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let elapsed = started.elapsed();
        info!(
            tasks = completed.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Startup tasks finished"
        );
        Ok(StartupReport { completed, elapsed })
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Journal(Arc<Mutex<Vec<String>>>);

    impl Journal {
        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    enum Behaviour {
        Succeed,
        Fail,
        Panic,
    }

    struct JournalTask {
        name: &'static str,
        journal: Journal,
        behaviour: Behaviour,
    }

    impl JournalTask {
        fn new(name: &'static str, journal: &Journal, behaviour: Behaviour) -> Self {
            Self {
                name,
                journal: journal.clone(),
                behaviour,
            }
        }
    }

    #[async_trait]
    impl StartupTask for JournalTask {
        fn name(&self) -> &str {
            self.name
        }

        async fn execute(&self) -> Result<(), TaskError> {
            self.journal.0.lock().unwrap().push(self.name.to_string());
            tokio::task::yield_now().await;
            match self.behaviour {
                Behaviour::Succeed => Ok(()),
                Behaviour::Fail => Err(TaskError::new("schema locked")),
                Behaviour::Panic => panic!("boom"),
            }
        }
    }

    #[tokio::test]
    async fn test_runs_in_registration_order() {
        let journal = Journal::default();
        let executor = StartupTaskExecutor::new()
            .with_task(JournalTask::new("migrate", &journal, Behaviour::Succeed))
            .with_task(JournalTask::new("seed", &journal, Behaviour::Succeed))
            .with_task(JournalTask::new("warm", &journal, Behaviour::Succeed));

        let report = executor.execute().await.unwrap();

        assert_eq!(journal.entries(), vec!["migrate", "seed", "warm"]);
        assert_eq!(report.completed, vec!["migrate", "seed", "warm"]);
        assert_eq!(executor.task_names(), vec!["migrate", "seed", "warm"]);
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        let journal = Journal::default();
        let executor = StartupTaskExecutor::new()
            .with_task(JournalTask::new("A", &journal, Behaviour::Succeed))
            .with_task(JournalTask::new("B", &journal, Behaviour::Fail))
            .with_task(JournalTask::new("C", &journal, Behaviour::Succeed));

        let err = executor.execute().await.unwrap_err();

        assert_eq!(journal.entries(), vec!["A", "B"]);
        assert_eq!(
            err,
            BootstrapError::StartupTaskFailure {
                task: "B".to_string(),
                reason: "schema locked".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_panicking_task_is_a_failure() {
        let journal = Journal::default();
        let executor = StartupTaskExecutor::new()
            .with_task(JournalTask::new("A", &journal, Behaviour::Panic))
            .with_task(JournalTask::new("B", &journal, Behaviour::Succeed));

        let err = executor.execute().await.unwrap_err();

        assert_eq!(journal.entries(), vec!["A"]);
        match err {
            BootstrapError::StartupTaskFailure { task, reason } => {
                assert_eq!(task, "A");
                assert_eq!(reason, "panicked: boom");
            }
            other => panic!("Expected StartupTaskFailure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_executes_at_most_once() {
        let journal = Journal::default();
        let mut executor = StartupTaskExecutor::new();
        executor.register(Arc::new(JournalTask::new("A", &journal, Behaviour::Succeed)));

        executor.execute().await.unwrap();
        let err = executor.execute().await.unwrap_err();

        assert_eq!(err, BootstrapError::AlreadyExecuted);
        assert_eq!(journal.entries(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_empty_executor_succeeds() {
        let report = StartupTaskExecutor::new().execute().await.unwrap();
        assert!(report.completed.is_empty());
    }
}
