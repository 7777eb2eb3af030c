//! In-memory todo storage with transactional writes
//!
//! Reads go straight to the shared map. Writes are staged on a
//! [`TodoTransaction`] and applied under a single write lock on commit, so
//! concurrent readers see either none or all of a transaction's changes.
//!
//! Every committed write stamps the row with a new store revision. A
//! transaction remembers the revision of each row it read and refuses to
//! commit a write over a row that changed since.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use todoflow_core::{PersistenceError, Transaction, TransactionProvider};

use crate::model::TodoItem;

/// Schema version the code expects
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Default)]
struct StoreState {
    schema_version: u32,
    items: HashMap<Uuid, TodoItem>,
    /// Last committed revision, bumped once per commit
    revision: u64,
    /// Revision that last wrote each live row
    revisions: HashMap<Uuid, u64>,
}

impl StoreState {
    fn ensure_ready(&self) -> Result<(), PersistenceError> {
        if self.schema_version < CURRENT_SCHEMA_VERSION {
            return Err(PersistenceError::Storage(format!(
                "schema version {} is behind {}, run migrations first",
                self.schema_version, CURRENT_SCHEMA_VERSION
            )));
        }
        Ok(())
    }
}

/// Shared in-memory todo store
#[derive(Debug, Clone, Default)]
pub struct TodoStore {
    state: Arc<RwLock<StoreState>>,
}

impl TodoStore {
    /// Create an empty, unmigrated store
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn schema_version(&self) -> u32 {
        self.state.read().await.schema_version
    }

    /// Bring the schema to [`CURRENT_SCHEMA_VERSION`]. Returns the number of
    /// migrations applied.
    pub async fn migrate(&self) -> Result<u32, PersistenceError> {
        let mut state = self.state.write().await;
        let applied = CURRENT_SCHEMA_VERSION.saturating_sub(state.schema_version);
        if applied > 0 {
            info!(
                from = state.schema_version,
                to = CURRENT_SCHEMA_VERSION,
                "Migrating todo schema"
            );
            state.schema_version = CURRENT_SCHEMA_VERSION;
        }
        Ok(applied)
    }

    /// Items owned by `owner`, oldest first
    pub async fn list_for_owner(&self, owner: &str) -> Result<Vec<TodoItem>, PersistenceError> {
        let state = self.state.read().await;
        state.ensure_ready()?;

        let mut items: Vec<TodoItem> = state
            .items
            .values()
            .filter(|item| item.is_owned_by(owner))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    pub async fn get(&self, id: &Uuid) -> Result<Option<TodoItem>, PersistenceError> {
        let state = self.state.read().await;
        state.ensure_ready()?;
        Ok(state.items.get(id).cloned())
    }

    pub async fn count(&self) -> Result<usize, PersistenceError> {
        let state = self.state.read().await;
        state.ensure_ready()?;
        Ok(state.items.len())
    }
}

#[async_trait]
impl TransactionProvider for TodoStore {
    type Transaction = TodoTransaction;

    async fn begin(&self) -> Result<TodoTransaction, PersistenceError> {
        self.state
            .read()
            .await
            .ensure_ready()
            .map_err(|e| PersistenceError::Begin(e.to_string()))?;

        Ok(TodoTransaction {
            id: Uuid::new_v4(),
            state: self.state.clone(),
            staged: HashMap::new(),
            observed: HashMap::new(),
        })
    }
}

/// Unit of work over a [`TodoStore`].
///
/// Staged writes are private to the transaction until commit. Dropping the
/// transaction discards them. Commit fails with [`PersistenceError::Commit`]
/// when a row this transaction read and then wrote was changed by another
/// commit in between.
#[derive(Debug)]
pub struct TodoTransaction {
    id: Uuid,
    state: Arc<RwLock<StoreState>>,
    /// `None` marks a staged delete
    staged: HashMap<Uuid, Option<TodoItem>>,
    /// Row revision seen on first read, `None` when the row did not exist
    observed: HashMap<Uuid, Option<u64>>,
}

impl TodoTransaction {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Read an item as this transaction sees it
    pub async fn get(&mut self, id: &Uuid) -> Result<Option<TodoItem>, PersistenceError> {
        if let Some(staged) = self.staged.get(id) {
            return Ok(staged.clone());
        }
        let state = self.state.read().await;
        state.ensure_ready()?;
        self.observed
            .entry(*id)
            .or_insert_with(|| state.revisions.get(id).copied());
        Ok(state.items.get(id).cloned())
    }

    /// Stage an insert or replacement
    pub fn put(&mut self, item: TodoItem) {
        self.staged.insert(item.id, Some(item));
    }

    /// Stage a delete
    pub fn delete(&mut self, id: Uuid) {
        self.staged.insert(id, None);
    }

    pub fn staged_changes(&self) -> usize {
        self.staged.len()
    }

    /// First staged row whose committed revision moved since it was read
    fn find_conflict(&self, state: &StoreState) -> Option<Uuid> {
        self.staged
            .keys()
            .find(|id| match self.observed.get(*id) {
                Some(seen) => state.revisions.get(*id).copied() != *seen,
                None => false,
            })
            .copied()
    }
}

#[async_trait]
impl Transaction for TodoTransaction {
    async fn commit(self) -> Result<(), PersistenceError> {
        let mut state = self.state.write().await;
        state
            .ensure_ready()
            .map_err(|e| PersistenceError::Commit(e.to_string()))?;

        if let Some(id) = self.find_conflict(&state) {
            debug!(transaction = %self.id, item = %id, "Todo transaction conflicted");
            return Err(PersistenceError::Commit(format!(
                "todo item {} was changed by a concurrent transaction",
                id
            )));
        }

        let changes = self.staged.len();
        state.revision += 1;
        let revision = state.revision;
        for (id, change) in self.staged {
            match change {
                Some(item) => {
                    state.items.insert(id, item);
                    state.revisions.insert(id, revision);
                }
                None => {
                    state.items.remove(&id);
                    state.revisions.remove(&id);
                }
            }
        }

        debug!(transaction = %self.id, changes, revision, "Todo transaction committed");
        Ok(())
    }

    async fn rollback(self) -> Result<(), PersistenceError> {
        debug!(
            transaction = %self.id,
            discarded = self.staged.len(),
            "Todo transaction rolled back"
        );
        Ok(())
    }
}
