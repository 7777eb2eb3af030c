//! Business steps executed by the todo flows

use todoflow_core::{FlowError, FlowExecutionContext, StepError};

pub mod security;
pub mod todo;

pub use security::GenerateJwtStep;
pub use todo::{
    AddTodoItemStep, DeleteTodoItemStep, GetTodoItemStep, GetTodoItemsStep, UpdateTodoItemStep,
};

/// Subject of the calling principal, or `unauthenticated`
pub(crate) fn require_subject(context: &FlowExecutionContext) -> Result<&str, FlowError> {
    context
        .principal()
        .subject()
        .ok_or_else(|| StepError::unauthenticated("an authenticated principal is required").into())
}

#[cfg(test)]
pub(crate) fn test_context(
    flow: &str,
    principal: todoflow_core::Principal,
) -> FlowExecutionContext {
    FlowExecutionContext::new(
        todoflow_core::FlowName::new(flow).unwrap(),
        todoflow_core::ConversationId::new(),
        principal,
        todoflow_core::CancellationToken::new(),
    )
}
