//! Publish side of the event hub.
//!
//! The service hands envelopes to a bounded outbox with `try_send`, so a
//! publish never waits on the queue. A forwarder task drains the outbox into
//! the internal event topic.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use tmf_persistence::schema::ResourceSchema;

use super::envelope::{EventEnvelope, Verb, classify};
use super::queue::Queue;

/// Sending half of the notification outbox.
#[derive(Debug, Clone)]
pub struct NotificationPublisher {
    sender: Option<mpsc::Sender<EventEnvelope>>,
}

impl NotificationPublisher {
    /// Creates a publisher and the receiving half of its outbox.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<EventEnvelope>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// A publisher that discards everything.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Enqueues an envelope without waiting. Returns false if it was dropped.
    pub fn publish(&self, envelope: EventEnvelope) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };
        match sender.try_send(envelope) {
            Ok(()) => true,
            Err(TrySendError::Full(envelope)) => {
                warn!(
                    event_id = %envelope.event_id,
                    event_type = %envelope.event_type,
                    "Notification outbox full, dropping event"
                );
                false
            }
            Err(TrySendError::Closed(envelope)) => {
                warn!(
                    event_id = %envelope.event_id,
                    event_type = %envelope.event_type,
                    "Notification outbox closed, dropping event"
                );
                false
            }
        }
    }

    /// Classifies a change and publishes it.
    ///
    /// Returns the published envelope. Read verbs and the broker's internal
    /// types publish nothing.
    pub fn notify(
        &self,
        verb: Verb,
        schema: &ResourceSchema,
        before: Option<&Value>,
        after: Option<&Value>,
    ) -> Option<EventEnvelope> {
        let resource_type = schema.resource_type;
        if resource_type.is_internal() {
            return None;
        }
        let kind = classify(verb, before, after, &schema.state_fields)?;
        let doc = after.or(before).cloned().unwrap_or(Value::Null);
        let envelope = EventEnvelope::new(resource_type, kind, doc);
        debug!(
            resource_type = %resource_type,
            event_type = %envelope.event_type,
            event_id = %envelope.event_id,
            "Publishing notification"
        );
        self.publish(envelope.clone()).then_some(envelope)
    }
}

/// Drains the outbox into a queue topic until every publisher is dropped.
pub fn spawn_forwarder(
    mut receiver: mpsc::Receiver<EventEnvelope>,
    queue: Arc<dyn Queue>,
    topic: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(envelope) = receiver.recv().await {
            let payload = match serde_json::to_value(&envelope) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(event_id = %envelope.event_id, error = %e, "Failed to serialize event");
                    continue;
                }
            };
            if let Err(e) = queue.produce(&topic, payload).await {
                warn!(event_id = %envelope.event_id, topic = %topic, error = %e, "Failed to enqueue event");
            }
        }
        debug!(topic = %topic, "Notification outbox closed, forwarder stopping");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tmf_persistence::schema::{ResourceType, SchemaRegistry};

    fn schema(rt: ResourceType) -> ResourceSchema {
        SchemaRegistry::embedded().get(rt).unwrap().clone()
    }

    #[tokio::test]
    async fn test_notify_create() {
        let (publisher, mut receiver) = NotificationPublisher::channel(4);
        let doc = json!({"id": "s1", "name": "svc1"});

        let sent = publisher
            .notify(Verb::Create, &schema(ResourceType::Service), None, Some(&doc))
            .unwrap();
        let received = receiver.recv().await.unwrap();

        assert_eq!(sent, received);
        assert_eq!(received.event_type, "ServiceCreationNotification");
        assert_eq!(received.event["service"], doc);
    }

    #[tokio::test]
    async fn test_read_and_internal_types_are_silent() {
        let (publisher, mut receiver) = NotificationPublisher::channel(4);
        let doc = json!({"id": "x"});

        assert!(publisher
            .notify(Verb::List, &schema(ResourceType::Service), None, Some(&doc))
            .is_none());
        assert!(publisher
            .notify(Verb::Create, &schema(ResourceType::Hub), None, Some(&doc))
            .is_none());
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_outbox_drops() {
        let (publisher, _receiver) = NotificationPublisher::channel(1);
        let service = schema(ResourceType::Service);
        let doc = json!({"id": "s1"});

        assert!(publisher.notify(Verb::Create, &service, None, Some(&doc)).is_some());
        assert!(publisher.notify(Verb::Create, &service, None, Some(&doc)).is_none());
    }

    #[test]
    fn test_disabled_publisher() {
        let doc = json!({"id": "s1"});
        assert!(NotificationPublisher::disabled()
            .notify(Verb::Create, &schema(ResourceType::Service), None, Some(&doc))
            .is_none());
    }

    #[tokio::test]
    async fn test_remove_carries_deleted_document() {
        let (publisher, mut receiver) = NotificationPublisher::channel(4);
        let doc = json!({"id": "s1", "state": "active"});

        publisher.notify(Verb::Remove, &schema(ResourceType::Service), Some(&doc), None);
        let received = receiver.recv().await.unwrap();
        assert_eq!(received.event_type, "ServiceRemoveNotification");
        assert_eq!(received.event["service"], doc);
    }
}
