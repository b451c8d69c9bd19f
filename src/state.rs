use crate::application::ports::mutation_gateway::DomainMutationGateway;
use crate::application::services::{
    ConnectivityMonitor, MutationReplayer, OutboxService, StatusReporter, SyncOrchestrator,
};
use crate::infrastructure::{
    ConnectionPool, HttpMutationGateway, PlatformConnectivitySource, SqliteOutboxStore,
};
use crate::presentation::handlers::OutboxHandler;
use crate::shared::{AppConfig, AppError};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Everything the host needs, wired from one [`AppConfig`].
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pool: ConnectionPool,
    /// Host glue reports platform network changes here.
    pub connectivity: Arc<PlatformConnectivitySource>,
    pub monitor: Arc<ConnectivityMonitor>,
    pub reporter: Arc<StatusReporter>,
    pub outbox_service: Arc<OutboxService>,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub outbox_handler: Arc<OutboxHandler>,
    reconnect_listener: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let gateway = Arc::new(HttpMutationGateway::new(&config.remote)?);
        let connectivity = Arc::new(PlatformConnectivitySource::default());
        Self::with_collaborators(config, gateway, connectivity).await
    }

    pub async fn with_collaborators(
        config: AppConfig,
        gateway: Arc<dyn DomainMutationGateway>,
        connectivity: Arc<PlatformConnectivitySource>,
    ) -> anyhow::Result<Self> {
        config.validate().map_err(AppError::ConfigurationError)?;

        let pool = ConnectionPool::new(&config.database).await?;
        pool.migrate().await?;

        let store = Arc::new(SqliteOutboxStore::new(pool.clone_pool()));
        let reporter = Arc::new(StatusReporter::new());
        let monitor = ConnectivityMonitor::new(connectivity.clone());
        let outbox_service = Arc::new(OutboxService::new(store.clone(), reporter.clone()));
        let orchestrator = SyncOrchestrator::new(
            store,
            Arc::new(MutationReplayer::new(gateway)),
            monitor.clone(),
            reporter.clone(),
        );
        let outbox_handler = Arc::new(OutboxHandler::new(
            outbox_service.clone(),
            orchestrator.clone(),
            reporter.clone(),
        ));

        let recovered = outbox_service.recover_in_flight().await?;
        tracing::info!(target: "outbox::sync", recovered, "outbox ready");

        monitor.start();
        let reconnect_listener = config
            .sync
            .auto_sync_on_reconnect
            .then(|| orchestrator.spawn_reconnect_listener());

        if config.sync.sync_on_startup && monitor.is_online() {
            orchestrator.trigger();
        }

        Ok(Self {
            config,
            pool,
            connectivity,
            monitor,
            reporter,
            outbox_service,
            orchestrator,
            outbox_handler,
            reconnect_listener: Arc::new(Mutex::new(reconnect_listener)),
        })
    }

    /// Stops the reconnect listener and closes the pool.
    pub async fn shutdown(&self) {
        let listener = self
            .reconnect_listener
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(handle) = listener {
            handle.abort();
        }
        self.pool.close().await;
    }
}
