//! Transaction contract consumed by transactional flows
//!
//! Persistence layers implement these traits to plug into
//! [`Transactional`](crate::application::boundary::Transactional).

use async_trait::async_trait;

use crate::error::PersistenceError;

/// An open unit of work.
///
/// Dropping a transaction without calling [`commit`](Transaction::commit)
/// must leave no durable effect.
#[async_trait]
pub trait Transaction: Send + Sync + 'static {
    /// Make every staged change durable
    async fn commit(self) -> Result<(), PersistenceError>;

    /// Discard every staged change
    async fn rollback(self) -> Result<(), PersistenceError>;
}

/// Starts transactions
#[async_trait]
pub trait TransactionProvider: Send + Sync {
    /// Handle type handed to the step
    type Transaction: Transaction;

    /// Begin a new transaction owned by the caller
    async fn begin(&self) -> Result<Self::Transaction, PersistenceError>;
}

