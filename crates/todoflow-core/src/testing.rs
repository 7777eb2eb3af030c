//! Test doubles for flows and their collaborators
//!
//! [`RecordingTracer`] captures every span opened and closed so tests can
//! assert on span counts and outcomes. [`FakeTransactionProvider`] hands out
//! [`FakeTransaction`]s whose begin/commit/rollback can be scripted to fail.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::telemetry::{
    FlowSpan, FlowTracer, SpanAttributes, SpanOutcome, ATTR_CONVERSATION_ID,
};
use crate::domain::transaction::{Transaction, TransactionProvider};
use crate::error::PersistenceError;
use crate::types::FlowName;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Snapshot of one span seen by a [`RecordingTracer`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSpan {
    /// Flow name the span was opened for
    pub name: String,
    /// Conversation id attribute at open time
    pub conversation_id: String,
    /// Attributes supplied at open time
    pub open_attributes: SpanAttributes,
    /// Outcome of the last completion, `None` while open
    pub outcome: Option<SpanOutcome>,
    /// Attributes supplied at completion
    pub close_attributes: SpanAttributes,
    /// How many times the span was completed
    pub close_count: usize,
}

/// Tracer that records spans in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingTracer {
    spans: Arc<Mutex<Vec<RecordedSpan>>>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All spans opened so far, in open order
    pub fn spans(&self) -> Vec<RecordedSpan> {
        lock(&self.spans).clone()
    }

    /// Spans that were opened but never completed
    pub fn open_spans(&self) -> usize {
        lock(&self.spans)
            .iter()
            .filter(|s| s.close_count == 0)
            .count()
    }
}

struct RecordingSpan {
    index: usize,
    spans: Arc<Mutex<Vec<RecordedSpan>>>,
}

impl FlowSpan for RecordingSpan {
    fn complete(self: Box<Self>, outcome: SpanOutcome, attributes: &SpanAttributes) {
        let mut spans = lock(&self.spans);
        if let Some(span) = spans.get_mut(self.index) {
            span.outcome = Some(outcome);
            span.close_attributes = attributes.clone();
            span.close_count += 1;
        }
    }
}

impl FlowTracer for RecordingTracer {
    fn open_span(&self, name: &FlowName, attributes: &SpanAttributes) -> Box<dyn FlowSpan> {
        let mut spans = lock(&self.spans);
        spans.push(RecordedSpan {
            name: name.to_string(),
            conversation_id: attributes
                .get(ATTR_CONVERSATION_ID)
                .cloned()
                .unwrap_or_default(),
            open_attributes: attributes.clone(),
            outcome: None,
            close_attributes: SpanAttributes::new(),
            close_count: 0,
        });
        Box::new(RecordingSpan {
            index: spans.len() - 1,
            spans: self.spans.clone(),
        })
    }
}

#[derive(Debug, Default)]
struct FakeState {
    begun: AtomicUsize,
    rollbacks: AtomicUsize,
    committed: Mutex<Vec<Vec<String>>>,
}

/// Transaction provider with scriptable failures
#[derive(Debug, Default, Clone)]
pub struct FakeTransactionProvider {
    state: Arc<FakeState>,
    fail_begin: bool,
    fail_commit: bool,
    fail_rollback: bool,
}

impl FakeTransactionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `begin` fails
    pub fn fail_begin(mut self) -> Self {
        self.fail_begin = true;
        self
    }

    /// Every `commit` fails
    pub fn fail_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// Every `rollback` fails (after being counted)
    pub fn fail_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    /// Number of transactions successfully begun
    pub fn begun(&self) -> usize {
        self.state.begun.load(Ordering::SeqCst)
    }

    /// Number of rollback attempts
    pub fn rollbacks(&self) -> usize {
        self.state.rollbacks.load(Ordering::SeqCst)
    }

    /// Staged operations of every committed transaction
    pub fn committed(&self) -> Vec<Vec<String>> {
        lock(&self.state.committed).clone()
    }
}

/// Transaction handed out by [`FakeTransactionProvider`]
#[derive(Debug)]
pub struct FakeTransaction {
    staged: Vec<String>,
    state: Arc<FakeState>,
    fail_commit: bool,
    fail_rollback: bool,
}

impl FakeTransaction {
    /// Record an operation; durable only if the transaction commits
    pub fn stage(&mut self, operation: impl Into<String>) {
        self.staged.push(operation.into());
    }
}

#[async_trait]
impl Transaction for FakeTransaction {
    async fn commit(self) -> Result<(), PersistenceError> {
        if self.fail_commit {
            return Err(PersistenceError::Commit("scripted commit failure".to_string()));
        }
        lock(&self.state.committed).push(self.staged);
        Ok(())
    }

    async fn rollback(self) -> Result<(), PersistenceError> {
        self.state.rollbacks.fetch_add(1, Ordering::SeqCst);
        if self.fail_rollback {
            return Err(PersistenceError::Rollback(
                "scripted rollback failure".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionProvider for FakeTransactionProvider {
    type Transaction = FakeTransaction;

    async fn begin(&self) -> Result<FakeTransaction, PersistenceError> {
        if self.fail_begin {
            return Err(PersistenceError::Begin("scripted begin failure".to_string()));
        }
        self.state.begun.fetch_add(1, Ordering::SeqCst);
        Ok(FakeTransaction {
            staged: Vec::new(),
            state: self.state.clone(),
            fail_commit: self.fail_commit,
            fail_rollback: self.fail_rollback,
        })
    }
}
