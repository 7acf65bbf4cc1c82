//! TMF resource broker wiring.
//!
//! [`Broker::start`] turns a [`ServiceConfig`] into a running broker: the
//! selected backend, the schema registry, the resource service and the
//! event hub workers.

use std::sync::Arc;

use tracing::info;

use tmf_persistence::backends::memory::MemoryBackend;
use tmf_persistence::{BackendKind, ResourceStore, SchemaRegistry};
use tmf_service::notification::{
    EventHub, EventHubHandle, HttpTransport, MemoryQueue, NotificationPublisher,
};
use tmf_service::{ResourceService, ServiceConfig};

#[cfg(feature = "sqlite")]
use tmf_persistence::backends::sqlite::{SqliteBackend, SqliteBackendConfig};

/// A running broker.
pub struct Broker {
    /// The resource service, handed to the controller layer.
    pub service: Arc<ResourceService>,
    /// The active backend.
    pub store: Arc<dyn ResourceStore>,
    hub: EventHubHandle,
}

impl Broker {
    /// Builds every component and starts the event hub.
    pub async fn start(config: &ServiceConfig) -> anyhow::Result<Self> {
        let backend_kind = config
            .storage_backend_kind()
            .map_err(|e| anyhow::anyhow!("Invalid storage backend configuration: {}", e))?;

        let store = create_store(backend_kind, config)?;
        store.health_check().await?;

        let registry = Arc::new(load_registry(config)?);
        info!(schemas = registry.len(), "Schema registry loaded");

        let queue = Arc::new(MemoryQueue::with_retry_policy(config.retry_policy()));
        let transport = Arc::new(HttpTransport::new(config.delivery_timeout())?);
        let (publisher, outbox) = NotificationPublisher::channel(config.outbox_capacity);

        let hub = EventHub::start(
            config,
            Arc::clone(&store),
            Arc::clone(&registry),
            queue,
            transport,
            outbox,
        )
        .await?;

        let service = Arc::new(ResourceService::new(
            Arc::clone(&store),
            registry,
            publisher,
            config,
        ));

        Ok(Self {
            service,
            store,
            hub,
        })
    }

    /// Number of running hub workers.
    pub fn worker_count(&self) -> usize {
        self.hub.worker_count()
    }

    /// Stops the event hub.
    pub fn shutdown(self) {
        self.hub.shutdown();
    }
}

fn create_store(kind: BackendKind, config: &ServiceConfig) -> anyhow::Result<Arc<dyn ResourceStore>> {
    match kind {
        BackendKind::Memory => {
            info!("Initializing in-memory backend");
            Ok(Arc::new(MemoryBackend::new()))
        }
        BackendKind::Sqlite => create_sqlite_store(config),
    }
}

/// Creates and initializes a SQLite backend from the configuration.
#[cfg(feature = "sqlite")]
fn create_sqlite_store(config: &ServiceConfig) -> anyhow::Result<Arc<dyn ResourceStore>> {
    let db_path = config.database_path();
    info!(database = %db_path, "Initializing SQLite backend");
    let backend = SqliteBackend::with_config(db_path, SqliteBackendConfig::default())?;
    Ok(Arc::new(backend))
}

/// Fallback when the sqlite feature is not enabled.
#[cfg(not(feature = "sqlite"))]
fn create_sqlite_store(_config: &ServiceConfig) -> anyhow::Result<Arc<dyn ResourceStore>> {
    anyhow::bail!(
        "The sqlite backend requires the 'sqlite' feature. \
         Build with: cargo build -p tmf-broker --features sqlite"
    )
}

fn load_registry(config: &ServiceConfig) -> anyhow::Result<SchemaRegistry> {
    match &config.schema_path {
        Some(path) => {
            info!(path = %path.display(), "Loading schema overrides");
            Ok(SchemaRegistry::load_from_path(path)?)
        }
        None => Ok(SchemaRegistry::embedded()),
    }
}
