//! Broker harness: a service on the memory backend with a running event hub.

use std::sync::Arc;
use std::time::Duration;

use http::{HeaderName, Method};
use serde_json::Value;

use tmf_persistence::backends::memory::MemoryBackend;
use tmf_persistence::schema::{ResourceType, SchemaRegistry};
use tmf_service::notification::{EventHub, EventHubHandle, MemoryQueue, NotificationPublisher};
use tmf_service::{RequestArgs, RequestContext, ResourceService, ServiceConfig, ServiceResponse};

use super::transport::RecordingTransport;

/// Base URL used by every test context.
pub const BASE_URL: &str = "http://localhost/tmf-api";

/// A service with its backend, queue and recorded webhooks.
pub struct TestBroker {
    pub service: ResourceService,
    pub store: Arc<MemoryBackend>,
    pub queue: Arc<MemoryQueue>,
    pub transport: Arc<RecordingTransport>,
    hub: Option<EventHubHandle>,
}

impl TestBroker {
    /// A broker whose event hub is running.
    pub async fn start() -> Self {
        Self::start_with(ServiceConfig::for_testing()).await
    }

    /// A broker with a custom configuration and a running event hub.
    pub async fn start_with(config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryBackend::new());
        let registry = Arc::new(SchemaRegistry::embedded());
        let queue = Arc::new(MemoryQueue::with_retry_policy(config.retry_policy()));
        let transport = Arc::new(RecordingTransport::default());
        let (publisher, outbox) = NotificationPublisher::channel(config.outbox_capacity);

        let hub = EventHub::start(
            &config,
            store.clone(),
            registry.clone(),
            queue.clone(),
            transport.clone(),
            outbox,
        )
        .await
        .expect("Failed to start event hub");

        let service = ResourceService::new(store.clone(), registry, publisher, &config);

        Self {
            service,
            store,
            queue,
            transport,
            hub: Some(hub),
        }
    }

    /// A broker with notifications disabled.
    pub fn offline(config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryBackend::new());
        let service = ResourceService::new(
            store.clone(),
            Arc::new(SchemaRegistry::embedded()),
            NotificationPublisher::disabled(),
            &config,
        );
        Self {
            service,
            store,
            queue: Arc::new(MemoryQueue::new()),
            transport: Arc::new(RecordingTransport::default()),
            hub: None,
        }
    }

    /// Creates a resource and returns the response.
    pub async fn create(&self, rt: ResourceType, body: Value) -> ServiceResponse {
        self.service
            .create(&RequestArgs::new().with_body(body), &ctx(rt, Method::POST))
            .await
            .expect("create failed")
    }

    /// Creates a resource and returns its id as text.
    pub async fn create_id(&self, rt: ResourceType, body: Value) -> String {
        let response = self.create(rt, body).await;
        id_of(response.payload.as_ref().expect("create returned no body"))
    }

    /// Registers a hub and returns its id.
    pub async fn subscribe(&self, callback: &str, query: &str) -> String {
        let response = self
            .service
            .register_hub(
                &RequestArgs::new().with_body(serde_json::json!({
                    "callback": callback,
                    "query": query,
                })),
                &ctx(ResourceType::Hub, Method::POST),
            )
            .await
            .expect("register_hub failed");
        id_of(response.payload.as_ref().expect("register_hub returned no body"))
    }
}

impl Drop for TestBroker {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.take() {
            hub.shutdown();
        }
    }
}

/// The API path of a resource type's collection.
pub fn collection_path(rt: ResourceType) -> String {
    let api = match rt {
        ResourceType::Service | ResourceType::Hub => "serviceInventory",
        ResourceType::ServiceOrder | ResourceType::Monitor => "serviceOrdering",
        _ => "serviceCatalogManagement",
    };
    format!("/{}/v4/{}", api, rt.event_key())
}

/// A request context for a resource type.
pub fn ctx(rt: ResourceType, method: Method) -> RequestContext {
    RequestContext::new(rt, format!("{}{}", method.as_str().to_lowercase(), rt), method)
        .with_base_url(BASE_URL)
        .with_path(collection_path(rt))
}

/// A context carrying `Prefer: respond-async`.
pub fn async_ctx(rt: ResourceType) -> RequestContext {
    ctx(rt, Method::POST).with_header(HeaderName::from_static("prefer"), "respond-async")
}

/// A document's id as text.
pub fn id_of(doc: &Value) -> String {
    match &doc["id"] {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Polls `condition` until it holds or two seconds pass.
pub async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
