//! Change notifications and webhook fan-out.
//!
//! ```text
//! ResourceService --try_send--> outbox --forwarder--> INTERNAL_EVENT
//!     INTERNAL_EVENT --EventHandler (match hubs)--> SUBSCRIPTION
//!     SUBSCRIPTION --DeliveryWorker--> POST <callback>
//! ```
//!
//! - [`NotificationPublisher`] - non-blocking publish side
//! - [`EventHandler`] - fan-out consumer
//! - [`DeliveryWorker`] - webhook consumer
//! - [`Queue`] / [`MemoryQueue`] - the topic queue between them
//! - [`EventHub`] - starts the consumers

mod delivery;
mod envelope;
mod event_handler;
mod hub;
mod publisher;
mod queue;

pub use delivery::{DeliveryError, DeliveryJob, DeliveryWorker, HttpTransport, WebhookTransport};
pub use envelope::{EventEnvelope, EventKind, Verb, classify};
pub use event_handler::EventHandler;
pub use hub::{EventHub, EventHubHandle};
pub use publisher::{NotificationPublisher, spawn_forwarder};
pub use queue::{
    MemoryQueue, MessageHandler, Queue, QueueError, QueueMessage, QueueResult, RetryPolicy,
};
