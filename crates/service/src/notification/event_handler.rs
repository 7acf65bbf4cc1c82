//! Fan-out side of the event hub.
//!
//! For each internal event the handler loads every hub, stores the event
//! transiently, evaluates each hub's filter against it through the backend
//! and enqueues one delivery job per match. The transient event is removed
//! once every hub has been tried, whatever the outcome.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use tmf_persistence::core::ResourceStore;
use tmf_persistence::error::ErrorKind;
use tmf_persistence::query::parse_subscription_filter;
use tmf_persistence::schema::{ResourceSchema, ResourceType, SchemaRegistry};
use tmf_persistence::types::{Condition, FieldValue, Query};

use crate::payload::strip_internal_fields;

use super::delivery::DeliveryJob;
use super::envelope::EventEnvelope;
use super::queue::{MessageHandler, Queue, QueueError, QueueMessage, QueueResult};

/// Consumer for the internal event topic.
pub struct EventHandler {
    store: Arc<dyn ResourceStore>,
    registry: Arc<SchemaRegistry>,
    queue: Arc<dyn Queue>,
    subscription_topic: String,
}

impl EventHandler {
    /// Creates a handler that enqueues deliveries on `subscription_topic`.
    pub fn new(
        store: Arc<dyn ResourceStore>,
        registry: Arc<SchemaRegistry>,
        queue: Arc<dyn Queue>,
        subscription_topic: impl Into<String>,
    ) -> Self {
        Self {
            store,
            registry,
            queue,
            subscription_topic: subscription_topic.into(),
        }
    }

    /// Fans one event out to the matching hubs.
    ///
    /// Returns the number of delivery jobs enqueued. Fails only when the
    /// hubs cannot be loaded or the event cannot be stored, in which case
    /// the message is retried.
    pub async fn process(&self, envelope: &EventEnvelope) -> QueueResult<usize> {
        let event_schema = self
            .registry
            .get(ResourceType::Event)
            .map_err(storage_failure)?;

        let hubs = self
            .store
            .find_many(ResourceType::Hub, &Query::new())
            .await
            .map_err(storage_failure)?
            .rows;

        if hubs.is_empty() {
            debug!(event_id = %envelope.event_id, "No hubs registered");
            return Ok(0);
        }

        match self
            .store
            .create(ResourceType::Event, envelope.to_document())
            .await
        {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::Conflict => {
                debug!(event_id = %envelope.event_id, "Event document already stored");
            }
            Err(e) => return Err(storage_failure(e)),
        }

        let mut body = envelope.to_value();
        strip_internal_fields(&mut body);

        let attempts = hubs
            .iter()
            .map(|hub| self.offer(hub, envelope, event_schema, &body));
        let delivered = join_all(attempts).await.into_iter().filter(|d| *d).count();

        self.cleanup(envelope).await;

        info!(
            event_id = %envelope.event_id,
            event_type = %envelope.event_type,
            hubs = hubs.len(),
            deliveries = delivered,
            "Event fanned out"
        );
        Ok(delivered)
    }

    /// Matches one hub and enqueues its delivery. Returns true if enqueued.
    async fn offer(
        &self,
        hub: &Value,
        envelope: &EventEnvelope,
        event_schema: &ResourceSchema,
        body: &Value,
    ) -> bool {
        let hub_id = hub
            .get("id")
            .map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default();

        let Some(callback) = hub.get("callback").and_then(Value::as_str) else {
            warn!(hub_id = %hub_id, "Skipping hub without callback");
            return false;
        };

        let Some(filter) = hub.get("query").and_then(Value::as_str) else {
            debug!(hub_id = %hub_id, "Skipping hub without filter");
            return false;
        };

        let criteria = match parse_subscription_filter(filter, event_schema) {
            Ok(criteria) => criteria,
            Err(e) => {
                warn!(hub_id = %hub_id, filter = %filter, error = %e, "Skipping hub with unparsable filter");
                return false;
            }
        };

        let mut query = Query::new().with_limit(1);
        query.criteria = criteria;
        query
            .criteria
            .add("id", Condition::Eq(FieldValue::from(envelope.event_id.as_str())));

        match self.store.find_many(ResourceType::Event, &query).await {
            Ok(page) if page.total > 0 => {}
            Ok(_) => return false,
            Err(e) => {
                warn!(hub_id = %hub_id, error = %e, "Hub filter evaluation failed");
                return false;
            }
        }

        let job = DeliveryJob::post(callback, body.clone(), hub_id.clone());
        let payload = match serde_json::to_value(&job) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(hub_id = %hub_id, error = %e, "Failed to serialize delivery job");
                return false;
            }
        };
        match self.queue.produce(&self.subscription_topic, payload).await {
            Ok(_) => {
                debug!(hub_id = %hub_id, event_id = %envelope.event_id, "Delivery job enqueued");
                true
            }
            Err(e) => {
                warn!(hub_id = %hub_id, error = %e, "Failed to enqueue delivery job");
                false
            }
        }
    }

    async fn cleanup(&self, envelope: &EventEnvelope) {
        let query = Query::by_id(FieldValue::from(envelope.event_id.as_str()));
        match self.store.remove(ResourceType::Event, &query).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                debug!(event_id = %envelope.event_id, "Event document already removed");
            }
            Err(e) => {
                warn!(event_id = %envelope.event_id, error = %e, "Failed to remove event document");
            }
        }
    }
}

fn storage_failure(err: impl std::fmt::Display) -> QueueError {
    QueueError::Handler {
        message: err.to_string(),
    }
}

#[async_trait]
impl MessageHandler for EventHandler {
    async fn handle(&self, message: &QueueMessage) -> QueueResult<()> {
        let envelope: EventEnvelope = match message.decode() {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "Discarding malformed event");
                return Ok(());
            }
        };
        self.process(&envelope).await.map(|_| ())
    }
}
