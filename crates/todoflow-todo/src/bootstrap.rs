//! Startup tasks and application-started listeners for the todo service

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use todoflow_core::{
    ApplicationStartedListener, StartupTask, TaskError, Transaction, TransactionProvider,
};
use tracing::info;

use crate::model::TodoItem;
use crate::store::TodoStore;

/// Brings the todo store to the current schema version
pub struct MigrateSchemaTask {
    store: Arc<TodoStore>,
}

impl MigrateSchemaTask {
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StartupTask for MigrateSchemaTask {
    fn name(&self) -> &str {
        "migrate-schema"
    }

    async fn execute(&self) -> Result<(), TaskError> {
        let applied = self.store.migrate().await?;
        info!(applied, "Todo schema up to date");
        Ok(())
    }
}

/// Inserts sample items for a demo user. Requires a migrated store.
pub struct SeedDemoDataTask {
    store: Arc<TodoStore>,
    owner: String,
}

impl SeedDemoDataTask {
    pub fn new(store: Arc<TodoStore>, owner: impl Into<String>) -> Self {
        Self {
            store,
            owner: owner.into(),
        }
    }

    fn demo_items(&self) -> Vec<TodoItem> {
        let mut done = TodoItem::new(&self.owner, "Read the getting started guide", None);
        done.completed = true;
        vec![
            done,
            TodoItem::new(
                &self.owner,
                "Add your first todo item",
                Some("POST it through Todo/AddTodoItem".to_string()),
            ),
            TodoItem::new(&self.owner, "Mark an item as completed", None),
        ]
    }
}

#[async_trait]
impl StartupTask for SeedDemoDataTask {
    fn name(&self) -> &str {
        "seed-demo-data"
    }

    async fn execute(&self) -> Result<(), TaskError> {
        if !self.store.list_for_owner(&self.owner).await?.is_empty() {
            info!(owner = %self.owner, "Demo data already present, skipping");
            return Ok(());
        }

        let items = self.demo_items();
        let count = items.len();
        let mut tx = self.store.begin().await?;
        for item in items {
            tx.put(item);
        }
        tx.commit().await?;

        info!(owner = %self.owner, count, "Seeded demo todo items");
        Ok(())
    }
}

/// Metadata captured when the service went live
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentRecord {
    pub service_name: String,
    pub version: String,
    pub environment: String,
    pub started_at: DateTime<Utc>,
}

/// Append-only log of deployments seen by this process
#[derive(Debug, Default)]
pub struct DeploymentLog {
    entries: Mutex<Vec<DeploymentRecord>>,
}

impl DeploymentLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, record: DeploymentRecord) -> Result<(), TaskError> {
        self.entries
            .lock()
            .map_err(|_| TaskError::new("deployment log lock poisoned"))?
            .push(record);
        Ok(())
    }

    pub fn entries(&self) -> Vec<DeploymentRecord> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

/// Records deployment metadata once the server accepts connections
pub struct RecordDeploymentListener {
    log: Arc<DeploymentLog>,
    service_name: String,
    version: String,
    environment: String,
}

impl RecordDeploymentListener {
    pub fn new(
        log: Arc<DeploymentLog>,
        service_name: impl Into<String>,
        version: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            log,
            service_name: service_name.into(),
            version: version.into(),
            environment: environment.into(),
        }
    }
}

#[async_trait]
impl ApplicationStartedListener for RecordDeploymentListener {
    fn name(&self) -> &str {
        "record-deployment"
    }

    async fn on_application_started(&self) -> Result<(), TaskError> {
        let record = DeploymentRecord {
            service_name: self.service_name.clone(),
            version: self.version.clone(),
            environment: self.environment.clone(),
            started_at: Utc::now(),
        };
        info!(
            service_name = %record.service_name,
            version = %record.version,
            environment = %record.environment,
            "Recording deployment"
        );
        self.log.record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use todoflow_core::{ApplicationStartedNotifier, BootstrapError, StartupTaskExecutor};

    #[tokio::test]
    async fn test_seed_requires_migration() {
        let store = Arc::new(TodoStore::new());

        let result = StartupTaskExecutor::new()
            .with_task(SeedDemoDataTask::new(store.clone(), "demo"))
            .with_task(MigrateSchemaTask::new(store.clone()))
            .execute()
            .await;

        match result {
            Err(BootstrapError::StartupTaskFailure { task, .. }) => {
                assert_eq!(task, "seed-demo-data")
            }
            other => panic!("Expected seed failure, got {:?}", other),
        }
        assert_eq!(store.schema_version().await, 0);
    }

    #[tokio::test]
    async fn test_migrate_then_seed() {
        let store = Arc::new(TodoStore::new());

        let report = StartupTaskExecutor::new()
            .with_task(MigrateSchemaTask::new(store.clone()))
            .with_task(SeedDemoDataTask::new(store.clone(), "demo"))
            .execute()
            .await
            .unwrap();

        assert_eq!(report.completed, vec!["migrate-schema", "seed-demo-data"]);
        let items = store.list_for_owner("demo").await.unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items.iter().filter(|i| i.completed).count(), 1);
    }

    #[tokio::test]
    async fn test_seed_skips_when_data_exists() {
        let store = Arc::new(TodoStore::new());
        store.migrate().await.unwrap();
        let seed = SeedDemoDataTask::new(store.clone(), "demo");

        seed.execute().await.unwrap();
        seed.execute().await.unwrap();

        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_listener_records_deployment() {
        let log = Arc::new(DeploymentLog::new());
        let notifier = ApplicationStartedNotifier::new().with_listener(
            RecordDeploymentListener::new(log.clone(), "todoflow", "0.1.0", "staging"),
        );

        let report = notifier.notify().await;

        assert_eq!(report.notified, vec!["record-deployment"]);
        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].service_name, "todoflow");
        assert_eq!(entries[0].version, "0.1.0");
        assert_eq!(entries[0].environment, "staging");
    }
}
