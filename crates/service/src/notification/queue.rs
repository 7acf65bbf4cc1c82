//! Topic queue between the publisher, the fan-out workers and the delivery
//! workers.
//!
//! [`Queue`] is the seam for a durable broker; [`MemoryQueue`] is the
//! in-process implementation. Consumers on the same topic compete for
//! messages. A message whose handler fails is rescheduled on its own task
//! after an exponential backoff, so a failing job never holds up the ones
//! behind it.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Queue error types.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("topic '{topic}' is closed")]
    Closed { topic: String },

    #[error("serialization error: {message}")]
    Serialization { message: String },

    #[error("handler failed: {message}")]
    Handler { message: String },
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// A message on a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
    /// Message id, stable across retries.
    pub id: String,
    /// Topic the message was produced on.
    pub topic: String,
    /// Opaque JSON payload.
    pub payload: Value,
    /// 1 for the first delivery, incremented on every retry.
    pub attempt: u32,
}

impl QueueMessage {
    /// Creates a first-attempt message.
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            topic: topic.into(),
            payload,
            attempt: 1,
        }
    }

    /// Decodes the payload.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> QueueResult<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

/// Retry behavior for failed messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts before a message is dropped.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Delay ceiling.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Returns true if a message that failed on `attempt` gets another try.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before retrying a message that failed on `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}

/// Processes messages pulled from a topic.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handles one message. An error schedules a retry.
    async fn handle(&self, message: &QueueMessage) -> QueueResult<()>;
}

/// A topic-based message queue.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Enqueues a payload on a topic and returns the message id.
    async fn produce(&self, topic: &str, payload: Value) -> QueueResult<String>;

    /// Starts one consumer on a topic.
    ///
    /// Every call adds a competing consumer; the returned task runs until
    /// aborted.
    async fn consume(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> QueueResult<JoinHandle<()>>;
}

struct Topic {
    sender: mpsc::UnboundedSender<QueueMessage>,
    receiver: Arc<AsyncMutex<mpsc::UnboundedReceiver<QueueMessage>>>,
}

impl Topic {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(AsyncMutex::new(receiver)),
        }
    }
}

/// In-process queue.
///
/// Messages produced before any consumer starts are buffered. Messages that
/// exhaust the retry policy are kept in a dead-letter list.
pub struct MemoryQueue {
    topics: Mutex<HashMap<String, Arc<Topic>>>,
    retry: RetryPolicy,
    dead_letters: Arc<Mutex<Vec<QueueMessage>>>,
}

impl std::fmt::Debug for MemoryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryQueue")
            .field("topics", &self.topics.lock().len())
            .field("retry", &self.retry)
            .finish()
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryQueue {
    /// Creates a queue with the default retry policy.
    pub fn new() -> Self {
        Self::with_retry_policy(RetryPolicy::default())
    }

    /// Creates a queue with a custom retry policy.
    pub fn with_retry_policy(retry: RetryPolicy) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            retry,
            dead_letters: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the messages that exhausted their retries.
    pub fn dead_letters(&self) -> Vec<QueueMessage> {
        self.dead_letters.lock().clone()
    }

    fn topic(&self, name: &str) -> Arc<Topic> {
        let mut topics = self.topics.lock();
        Arc::clone(
            topics
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Topic::new())),
        )
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn produce(&self, topic: &str, payload: Value) -> QueueResult<String> {
        let message = QueueMessage::new(topic, payload);
        let id = message.id.clone();
        self.topic(topic)
            .sender
            .send(message)
            .map_err(|_| QueueError::Closed {
                topic: topic.to_string(),
            })?;
        debug!(topic, message_id = %id, "Message produced");
        Ok(id)
    }

    async fn consume(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> QueueResult<JoinHandle<()>> {
        let topic_handle = self.topic(topic);
        let retry = self.retry;
        let dead_letters = Arc::clone(&self.dead_letters);
        let topic_name = topic.to_string();

        Ok(tokio::spawn(async move {
            loop {
                let next = {
                    let mut receiver = topic_handle.receiver.lock().await;
                    receiver.recv().await
                };
                let Some(message) = next else {
                    debug!(topic = %topic_name, "Topic closed, consumer stopping");
                    break;
                };

                if let Err(e) = handler.handle(&message).await {
                    reschedule(&topic_handle, message, e, retry, &dead_letters);
                }
            }
        }))
    }
}

fn reschedule(
    topic: &Arc<Topic>,
    message: QueueMessage,
    err: QueueError,
    retry: RetryPolicy,
    dead_letters: &Arc<Mutex<Vec<QueueMessage>>>,
) {
    if !retry.should_retry(message.attempt) {
        error!(
            topic = %message.topic,
            message_id = %message.id,
            attempts = message.attempt,
            error = %err,
            "Message dropped after exhausting retries"
        );
        dead_letters.lock().push(message);
        return;
    }

    let delay = retry.backoff(message.attempt);
    warn!(
        topic = %message.topic,
        message_id = %message.id,
        attempt = message.attempt,
        delay_ms = delay.as_millis() as u64,
        error = %err,
        "Message failed, retrying"
    );

    let sender = topic.sender.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let retried = QueueMessage {
            attempt: message.attempt + 1,
            ..message
        };
        if sender.send(retried).is_err() {
            warn!("Topic closed before retry could be enqueued");
        }
    });
}
