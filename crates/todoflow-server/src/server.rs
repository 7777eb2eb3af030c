//! Server assembly and lifecycle
//!
//! Startup order: run every startup task, bind the listener, start serving,
//! then notify application-started listeners. A failing startup task aborts
//! before the listener is bound.

use std::net::SocketAddr;
use std::sync::Arc;
use todoflow_core::{
    ApplicationStartedListener, ApplicationStartedNotifier, NotificationReport, StartupTask,
    StartupTaskExecutor,
};
use todoflow_monitoring::{LogExt, TracingFlowTracer};
use todoflow_todo::{
    DeploymentLog, InMemoryUserDirectory, JwtTokenIssuer, MigrateSchemaTask,
    RecordDeploymentListener, SeedDemoDataTask, TodoFlows, TodoStore,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::{build_router, AppState};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Owner of the demo items and name of the demo user
pub const DEMO_USER: &str = "demo";

/// Main server implementation
pub struct TodoflowServer {
    config: ServerConfig,
    state: AppState,
    startup: StartupTaskExecutor,
    notifier: ApplicationStartedNotifier,
}

impl TodoflowServer {
    /// Wire store, flows, startup tasks and listeners from `config`
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let store = Arc::new(TodoStore::new());
        let deployments = Arc::new(DeploymentLog::new());

        let mut users = InMemoryUserDirectory::new();
        if config.seed_demo_data {
            users = users.with_user(DEMO_USER, DEMO_USER, &["user"]);
        }
        let issuer = JwtTokenIssuer::new(
            config.jwt_secret.clone(),
            config.jwt_issuer.clone(),
            config.jwt_audience.clone(),
            config.jwt_expiry_seconds,
        );

        let flows = TodoFlows::new(
            Arc::new(TracingFlowTracer::new(crate::SERVICE_NAME)),
            store.clone(),
            Arc::new(users),
            Arc::new(issuer),
        )?;

        let mut startup = StartupTaskExecutor::new();
        startup.register(Arc::new(MigrateSchemaTask::new(store.clone())));
        if config.seed_demo_data {
            startup.register(Arc::new(SeedDemoDataTask::new(store.clone(), DEMO_USER)));
        }

        let mut notifier = ApplicationStartedNotifier::new();
        notifier.register(Arc::new(RecordDeploymentListener::new(
            deployments.clone(),
            crate::SERVICE_NAME,
            env!("CARGO_PKG_VERSION"),
            config.environment.clone(),
        )));

        let state = AppState {
            flows: Arc::new(flows),
            store,
            deployments,
            environment: config.environment.clone(),
        };

        Ok(Self {
            config,
            state,
            startup,
            notifier,
        })
    }

    /// Add a startup task after the built-in ones
    pub fn register_startup_task(&mut self, task: Arc<dyn StartupTask>) -> &mut Self {
        self.startup.register(task);
        self
    }

    /// Add an application-started listener after the built-in ones
    pub fn register_listener(&mut self, listener: Arc<dyn ApplicationStartedListener>) -> &mut Self {
        self.notifier.register(listener);
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Bootstrap and start serving until `shutdown` is cancelled
    pub async fn start(self, shutdown: CancellationToken) -> ServerResult<RunningServer> {
        info!(environment = %self.config.environment, "Starting Todoflow Server");

        let report = self
            .startup
            .execute()
            .await
            .log_err("Startup tasks failed, not accepting connections")?;
        info!(
            tasks = report.completed.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Startup tasks completed"
        );

        let listener = TcpListener::bind(self.config.socket_addr()?)
            .await
            .log_err("Failed to bind listener")?;
        let addr = listener.local_addr()?;
        info!("Listening on {}", addr);

        let app = build_router(self.state.clone());
        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
        });

        let notification = self.notifier.notify().await;
        if !notification.failures.is_empty() {
            warn!(
                failed = notification.failures.len(),
                "Some application-started listeners failed"
            );
        }

        Ok(RunningServer {
            addr,
            shutdown,
            handle,
            notification,
        })
    }
}

/// Handle to a server that is accepting connections
pub struct RunningServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<std::io::Result<()>>,
    notification: NotificationReport,
}

impl RunningServer {
    /// Get the server's bound address
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Outcome of the application-started notification
    pub fn notification(&self) -> &NotificationReport {
        &self.notification
    }

    /// Wait until the server stops
    pub async fn wait(self) -> ServerResult<()> {
        self.handle
            .await
            .map_err(|e| ServerError::InternalError(format!("Server task failed: {}", e)))??;
        info!("Server stopped");
        Ok(())
    }

    /// Request a graceful shutdown and wait for it
    pub async fn shutdown(self) -> ServerResult<()> {
        self.shutdown.cancel();
        self.wait().await
    }
}
