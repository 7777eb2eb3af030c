//! Execution boundaries composed around a flow step
//!
//! A boundary decides what surrounds the step: nothing at all
//! ([`NonTransactional`]) or a begin/commit/rollback unit of work
//! ([`Transactional`]). The step receives the boundary's scope by `&mut`,
//! so a transaction handle is owned by exactly one invocation.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::context::FlowExecutionContext;
use crate::domain::transaction::{Transaction, TransactionProvider};
use crate::error::FlowError;

/// Strategy wrapping step execution
#[async_trait]
pub trait ExecutionBoundary: Send + Sync {
    /// Per-invocation scope handed to the step
    type Scope: Send;

    /// Short label used in logs
    fn label(&self) -> &'static str;

    /// Enter the boundary before the step runs
    async fn open(&self, context: &FlowExecutionContext) -> Result<Self::Scope, FlowError>;

    /// Leave the boundary after the step succeeded
    async fn complete(
        &self,
        scope: Self::Scope,
        context: &FlowExecutionContext,
    ) -> Result<(), FlowError>;

    /// Leave the boundary after the step failed or was cancelled.
    ///
    /// Never fails: `cause` is what the caller will see.
    async fn abort(&self, scope: Self::Scope, context: &FlowExecutionContext, cause: &FlowError);
}

/// Scope of a step running without a transaction
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoTransaction;

/// Steps run with no ambient transaction
#[derive(Debug, Default, Clone, Copy)]
pub struct NonTransactional;

#[async_trait]
impl ExecutionBoundary for NonTransactional {
    type Scope = NoTransaction;

    fn label(&self) -> &'static str {
        "non_transactional"
    }

    async fn open(&self, _context: &FlowExecutionContext) -> Result<NoTransaction, FlowError> {
        Ok(NoTransaction)
    }

    async fn complete(
        &self,
        _scope: NoTransaction,
        _context: &FlowExecutionContext,
    ) -> Result<(), FlowError> {
        Ok(())
    }

    async fn abort(&self, _scope: NoTransaction, _context: &FlowExecutionContext, _cause: &FlowError) {}
}

/// Steps run inside a transaction begun by `P`
pub struct Transactional<P> {
    provider: Arc<P>,
}

impl<P> Transactional<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

impl<P> Clone for Transactional<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
        }
    }
}

#[async_trait]
impl<P: TransactionProvider> ExecutionBoundary for Transactional<P> {
    type Scope = P::Transaction;

    fn label(&self) -> &'static str {
        "transactional"
    }

    async fn open(&self, context: &FlowExecutionContext) -> Result<P::Transaction, FlowError> {
        let transaction = self.provider.begin().await?;
        debug!(
            flow = %context.flow_name(),
            conversation_id = %context.conversation_id(),
            "Transaction started"
        );
        Ok(transaction)
    }

    async fn complete(
        &self,
        scope: P::Transaction,
        context: &FlowExecutionContext,
    ) -> Result<(), FlowError> {
        scope.commit().await?;
        debug!(
            flow = %context.flow_name(),
            conversation_id = %context.conversation_id(),
            "Transaction committed"
        );
        Ok(())
    }

    async fn abort(&self, scope: P::Transaction, context: &FlowExecutionContext, cause: &FlowError) {
        match scope.rollback().await {
            Ok(()) => debug!(
                flow = %context.flow_name(),
                conversation_id = %context.conversation_id(),
                cause = %cause.kind(),
                "Transaction rolled back"
            ),
            Err(rollback_error) => warn!(
                flow = %context.flow_name(),
                conversation_id = %context.conversation_id(),
                cause = %cause.kind(),
                error = %rollback_error,
                "Rollback failed, reporting original failure"
            ),
        }
    }
}
