//! Event hub wiring.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use tmf_persistence::core::ResourceStore;
use tmf_persistence::schema::SchemaRegistry;

use crate::config::ServiceConfig;

use super::delivery::{DeliveryWorker, WebhookTransport};
use super::envelope::EventEnvelope;
use super::event_handler::EventHandler;
use super::publisher::spawn_forwarder;
use super::queue::{Queue, QueueResult};

/// The running event hub tasks.
#[derive(Debug)]
pub struct EventHubHandle {
    forwarder: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl EventHubHandle {
    /// Number of consumer tasks (fan-out plus delivery).
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stops every hub task. Messages still queued are abandoned.
    pub fn shutdown(self) {
        self.forwarder.abort();
        for worker in &self.workers {
            worker.abort();
        }
        info!(workers = self.workers.len(), "Event hub stopped");
    }
}

/// Starts the publish forwarder, fan-out consumers and delivery consumers.
pub struct EventHub;

impl EventHub {
    /// Spawns the hub tasks.
    ///
    /// `outbox` is the receiving half of the publisher channel handed to the
    /// resource service.
    pub async fn start(
        config: &ServiceConfig,
        store: Arc<dyn ResourceStore>,
        registry: Arc<SchemaRegistry>,
        queue: Arc<dyn Queue>,
        transport: Arc<dyn WebhookTransport>,
        outbox: mpsc::Receiver<EventEnvelope>,
    ) -> QueueResult<EventHubHandle> {
        let forwarder = spawn_forwarder(
            outbox,
            Arc::clone(&queue),
            config.internal_event_topic.clone(),
        );

        let fan_out = Arc::new(EventHandler::new(
            store,
            registry,
            Arc::clone(&queue),
            config.subscription_topic.clone(),
        ));
        let delivery = Arc::new(DeliveryWorker::new(transport));

        let mut workers = Vec::with_capacity(config.fan_out_workers + config.delivery_workers);
        for _ in 0..config.fan_out_workers {
            workers.push(
                queue
                    .consume(&config.internal_event_topic, fan_out.clone())
                    .await?,
            );
        }
        for _ in 0..config.delivery_workers {
            workers.push(
                queue
                    .consume(&config.subscription_topic, delivery.clone())
                    .await?,
            );
        }

        info!(
            internal_topic = %config.internal_event_topic,
            subscription_topic = %config.subscription_topic,
            fan_out_workers = config.fan_out_workers,
            delivery_workers = config.delivery_workers,
            "Event hub started"
        );

        Ok(EventHubHandle { forwarder, workers })
    }
}
