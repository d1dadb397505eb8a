use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::channel_transport::ChannelTransport;
use crate::application::ports::local_mirror::LocalMirror;
use crate::application::ports::remote_gateway::RemoteGateway;
use crate::application::services::{
    ChannelRegistry, DispatchService, JournalService, QueueService, SessionService, SyncEngine,
};
use crate::infrastructure::connectivity::ConnectivityMonitor;
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::folio::SqliteJournalStore;
use crate::infrastructure::offline::{SqliteActionStore, StartupRecovery};
use crate::infrastructure::realtime::InMemoryChannelHub;
use crate::infrastructure::remote::HttpRemoteGateway;
use crate::infrastructure::session::SqliteSessionStore;
use crate::shared::config::AppConfig;
use crate::shared::metrics::SyncMetrics;

/// Owns every long-lived service of the sync layer. Hosts hold one of
/// these for the lifetime of the process and reach the services through
/// the public fields.
pub struct SyncContext {
    pub config: AppConfig,
    pub pool: ConnectionPool,
    pub session: Arc<SessionService>,
    pub queue: Arc<QueueService>,
    pub journal: Arc<JournalService>,
    pub dispatcher: Arc<DispatchService>,
    pub sync_engine: Arc<SyncEngine>,
    pub channels: Arc<ChannelRegistry>,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub metrics: Arc<SyncMetrics>,
    pub recovery: Arc<StartupRecovery>,
    background: Vec<tokio::task::JoinHandle<()>>,
}

impl SyncContext {
    /// Wires the production stack: SQLite persistence, HTTP remote
    /// gateway, in-process channel hub. Background sync tasks start
    /// here when auto-sync is enabled.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(|msg| anyhow::anyhow!("invalid configuration: {msg}"))?;

        std::fs::create_dir_all(&config.storage.data_dir)?;

        let gateway = Arc::new(
            HttpRemoteGateway::new(
                config.remote.base_url.clone(),
                Duration::from_millis(config.remote.request_timeout_ms),
            )
            .map_err(|err| anyhow::anyhow!("failed to build remote gateway: {err}"))?,
        );

        SyncContextBuilder::new(config)
            .with_gateway(gateway)
            .build()
            .await
    }

    /// Aborts background tasks and closes the pool. Idempotent; safe to
    /// call on drop paths.
    pub async fn shutdown(&mut self) {
        for handle in self.background.drain(..) {
            handle.abort();
        }
        self.pool.close().await;
    }
}

/// Assembles a [`SyncContext`] with any port swapped out. Used by hosts
/// with their own transport or connectivity probe, and by tests that
/// inject fakes.
pub struct SyncContextBuilder {
    config: AppConfig,
    gateway: Option<Arc<dyn RemoteGateway>>,
    transport: Option<Arc<dyn ChannelTransport>>,
    connectivity: Option<Arc<ConnectivityMonitor>>,
    mirror: Option<Arc<dyn LocalMirror>>,
    in_memory: bool,
}

impl SyncContextBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            gateway: None,
            transport: None,
            connectivity: None,
            mirror: None,
            in_memory: false,
        }
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn RemoteGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn ChannelTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_connectivity(mut self, monitor: Arc<ConnectivityMonitor>) -> Self {
        self.connectivity = Some(monitor);
        self
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn LocalMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Backs the context with an in-memory database regardless of the
    /// configured URL.
    pub fn in_memory(mut self) -> Self {
        self.in_memory = true;
        self
    }

    pub async fn build(self) -> anyhow::Result<SyncContext> {
        let config = self.config;

        let pool = if self.in_memory {
            ConnectionPool::from_memory().await?
        } else {
            ConnectionPool::new(
                &config.database.url,
                config.database.max_connections,
                Duration::from_secs(config.database.connection_timeout),
            )
            .await?
        };
        pool.migrate().await?;

        let gateway = self
            .gateway
            .ok_or_else(|| anyhow::anyhow!("a remote gateway is required"))?;
        let connectivity = self
            .connectivity
            .unwrap_or_else(|| Arc::new(ConnectivityMonitor::new(true)));
        let transport: Arc<dyn ChannelTransport> = match self.transport {
            Some(t) => t,
            None => Arc::new(InMemoryChannelHub::new()),
        };

        let action_store = Arc::new(SqliteActionStore::new(pool.get_pool().clone()));
        let journal_store = Arc::new(SqliteJournalStore::new(pool.get_pool().clone()));
        let session_store = Arc::new(SqliteSessionStore::new(pool.get_pool().clone()));

        let metrics = Arc::new(SyncMetrics::new());
        let session = Arc::new(SessionService::new(session_store));
        let queue = Arc::new(QueueService::new(action_store.clone(), session.clone()));
        let journal = Arc::new(JournalService::new(journal_store.clone(), session.clone()));

        let remote_timeout = Duration::from_millis(config.sync.remote_timeout_ms);
        let dispatcher = Arc::new(DispatchService::new(
            session.clone(),
            queue.clone(),
            journal.clone(),
            connectivity.clone(),
            gateway.clone(),
            self.mirror,
            metrics.clone(),
            remote_timeout,
        ));

        let retention_window =
            chrono::Duration::seconds(config.sync.retention_window_secs as i64);
        let sync_engine = Arc::new(SyncEngine::new(
            session.clone(),
            queue.clone(),
            gateway,
            connectivity.clone(),
            metrics.clone(),
            remote_timeout,
            retention_window,
            config.sync.max_retry,
        ));

        let channels = Arc::new(ChannelRegistry::new(
            transport,
            session.clone(),
            config.realtime.mode,
        ));

        let recovery = StartupRecovery::new(None, action_store, journal_store);

        let mut background = Vec::new();
        if config.sync.auto_sync {
            background.push(sync_engine.spawn_auto_sync());
            background.push(
                sync_engine.spawn_maintenance(Duration::from_secs(config.sync.sync_interval)),
            );
        }

        tracing::info!(
            target: "sync::context",
            auto_sync = config.sync.auto_sync,
            realtime_mode = ?config.realtime.mode,
            "sync context initialized"
        );

        Ok(SyncContext {
            config,
            pool,
            session,
            queue,
            journal,
            dispatcher,
            sync_engine,
            channels,
            connectivity,
            metrics,
            recovery,
            background,
        })
    }
}
