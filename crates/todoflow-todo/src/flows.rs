//! Explicit composition of every todo flow

use std::sync::Arc;
use todoflow_core::{Flow, FlowBuilder, FlowError, FlowTracer, Transactional};

use crate::auth::{TokenIssuer, UserDirectory};
use crate::steps::{
    AddTodoItemStep, DeleteTodoItemStep, GenerateJwtStep, GetTodoItemStep, GetTodoItemsStep,
    UpdateTodoItemStep,
};
use crate::store::TodoStore;

pub const GENERATE_JWT: &str = "Security/GenerateJwt";
pub const GET_TODO_ITEMS: &str = "Todo/GetTodoItems";
pub const GET_TODO_ITEM: &str = "Todo/GetTodoItem";
pub const ADD_TODO_ITEM: &str = "Todo/AddTodoItem";
pub const UPDATE_TODO_ITEM: &str = "Todo/UpdateTodoItem";
pub const DELETE_TODO_ITEM: &str = "Todo/DeleteTodoItem";

type WriteFlow<S> = Flow<S, Transactional<TodoStore>>;

/// All flows of the service, sharing one tracer and one store
pub struct TodoFlows {
    pub generate_jwt: Flow<GenerateJwtStep>,
    pub get_todo_items: Flow<GetTodoItemsStep>,
    pub get_todo_item: Flow<GetTodoItemStep>,
    pub add_todo_item: WriteFlow<AddTodoItemStep>,
    pub update_todo_item: WriteFlow<UpdateTodoItemStep>,
    pub delete_todo_item: WriteFlow<DeleteTodoItemStep>,
}

impl TodoFlows {
    pub fn new(
        tracer: Arc<dyn FlowTracer>,
        store: Arc<TodoStore>,
        users: Arc<dyn UserDirectory>,
        issuer: Arc<dyn TokenIssuer>,
    ) -> Result<Self, FlowError> {
        Ok(Self {
            generate_jwt: FlowBuilder::new(GENERATE_JWT)
                .tracer(tracer.clone())
                .step(GenerateJwtStep::new(users, issuer))
                .build()?,
            get_todo_items: FlowBuilder::new(GET_TODO_ITEMS)
                .tracer(tracer.clone())
                .step(GetTodoItemsStep::new(store.clone()))
                .build()?,
            get_todo_item: FlowBuilder::new(GET_TODO_ITEM)
                .tracer(tracer.clone())
                .step(GetTodoItemStep::new(store.clone()))
                .build()?,
            add_todo_item: FlowBuilder::new(ADD_TODO_ITEM)
                .tracer(tracer.clone())
                .step(AddTodoItemStep)
                .transactional(store.clone())
                .build()?,
            update_todo_item: FlowBuilder::new(UPDATE_TODO_ITEM)
                .tracer(tracer.clone())
                .step(UpdateTodoItemStep)
                .transactional(store.clone())
                .build()?,
            delete_todo_item: FlowBuilder::new(DELETE_TODO_ITEM)
                .tracer(tracer)
                .step(DeleteTodoItemStep)
                .transactional(store)
                .build()?,
        })
    }

    /// Names of every flow, in declaration order
    pub fn names(&self) -> Vec<&str> {
        vec![
            self.generate_jwt.name().as_str(),
            self.get_todo_items.name().as_str(),
            self.get_todo_item.name().as_str(),
            self.add_todo_item.name().as_str(),
            self.update_todo_item.name().as_str(),
            self.delete_todo_item.name().as_str(),
        ]
    }
}
