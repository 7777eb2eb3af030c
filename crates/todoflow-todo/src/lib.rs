//! Todo list service built on the todoflow framework
//!
//! This crate provides the business side of the service: the in-memory
//! [`TodoStore`], the token issuing and todo list flows composed in
//! [`TodoFlows`], and the startup tasks and listeners the server registers.

pub mod auth;
pub mod bootstrap;
pub mod flows;
pub mod model;
pub mod steps;
pub mod store;

pub use auth::{
    Claims, InMemoryUserDirectory, JwtTokenIssuer, TokenError, TokenIssuer, UserDirectory,
};
pub use bootstrap::{
    DeploymentLog, DeploymentRecord, MigrateSchemaTask, RecordDeploymentListener,
    SeedDemoDataTask,
};
pub use flows::TodoFlows;
pub use model::{Credentials, IssuedToken, NewTodoItem, TodoItem, TodoItemKey, TodoItemUpdate};
pub use store::{TodoStore, TodoTransaction, CURRENT_SCHEMA_VERSION};
