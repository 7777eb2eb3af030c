//! Owner-scoped todo list steps
//!
//! Items belonging to someone else are reported as `not_found` so callers
//! cannot probe for ids they do not own.

use async_trait::async_trait;
use std::sync::Arc;
use todoflow_core::{FlowError, FlowExecutionContext, FlowStep, NoTransaction, StepError};
use tracing::debug;
use uuid::Uuid;

use super::require_subject;
use crate::model::{NewTodoItem, TodoItem, TodoItemKey, TodoItemUpdate};
use crate::store::{TodoStore, TodoTransaction};

fn not_found(id: &Uuid) -> FlowError {
    StepError::not_found(format!("todo item {} not found", id)).into()
}

/// Lists the caller's items
pub struct GetTodoItemsStep {
    store: Arc<TodoStore>,
}

impl GetTodoItemsStep {
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl FlowStep for GetTodoItemsStep {
    type Input = ();
    type Output = Vec<TodoItem>;

    async fn execute(
        &self,
        _input: (),
        context: &FlowExecutionContext,
        _scope: &mut NoTransaction,
    ) -> Result<Vec<TodoItem>, FlowError> {
        let owner = require_subject(context)?;
        Ok(self.store.list_for_owner(owner).await?)
    }
}

/// Fetches one of the caller's items
pub struct GetTodoItemStep {
    store: Arc<TodoStore>,
}

impl GetTodoItemStep {
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl FlowStep for GetTodoItemStep {
    type Input = TodoItemKey;
    type Output = TodoItem;

    async fn execute(
        &self,
        input: TodoItemKey,
        context: &FlowExecutionContext,
        _scope: &mut NoTransaction,
    ) -> Result<TodoItem, FlowError> {
        let owner = require_subject(context)?;
        self.store
            .get(&input.id)
            .await?
            .filter(|item| item.is_owned_by(owner))
            .ok_or_else(|| not_found(&input.id))
    }
}

/// Creates an item owned by the caller
#[derive(Debug, Default)]
pub struct AddTodoItemStep;

#[async_trait]
impl FlowStep<TodoTransaction> for AddTodoItemStep {
    type Input = NewTodoItem;
    type Output = TodoItem;

    async fn execute(
        &self,
        input: NewTodoItem,
        context: &FlowExecutionContext,
        tx: &mut TodoTransaction,
    ) -> Result<TodoItem, FlowError> {
        let owner = require_subject(context)?;
        let item = TodoItem::new(owner, input.title.trim(), input.description);

        debug!(item_id = %item.id, owner, "Staging new todo item");
        tx.put(item.clone());
        Ok(item)
    }
}

/// Changes title, description or completion of one of the caller's items
#[derive(Debug, Default)]
pub struct UpdateTodoItemStep;

#[async_trait]
impl FlowStep<TodoTransaction> for UpdateTodoItemStep {
    type Input = TodoItemUpdate;
    type Output = TodoItem;

    async fn execute(
        &self,
        input: TodoItemUpdate,
        context: &FlowExecutionContext,
        tx: &mut TodoTransaction,
    ) -> Result<TodoItem, FlowError> {
        let owner = require_subject(context)?;
        let mut item = tx
            .get(&input.id)
            .await?
            .filter(|item| item.is_owned_by(owner))
            .ok_or_else(|| not_found(&input.id))?;

        input.apply_to(&mut item);

        tx.put(item.clone());
        Ok(item)
    }
}

/// Removes one of the caller's items
#[derive(Debug, Default)]
pub struct DeleteTodoItemStep;

#[async_trait]
impl FlowStep<TodoTransaction> for DeleteTodoItemStep {
    type Input = TodoItemKey;
    type Output = ();

    async fn execute(
        &self,
        input: TodoItemKey,
        context: &FlowExecutionContext,
        tx: &mut TodoTransaction,
    ) -> Result<(), FlowError> {
        let owner = require_subject(context)?;
        let item = tx
            .get(&input.id)
            .await?
            .filter(|item| item.is_owned_by(owner))
            .ok_or_else(|| not_found(&input.id))?;

        tx.delete(item.id);
        Ok(())
    }
}
