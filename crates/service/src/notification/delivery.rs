//! Webhook delivery.
//!
//! [`DeliveryWorker`] consumes delivery jobs from the subscription topic and
//! POSTs them through a [`WebhookTransport`]. A failed POST fails the
//! message, which hands it back to the queue's retry policy.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::queue::{MessageHandler, QueueError, QueueMessage, QueueResult};

/// Delivery error types.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("callback {uri} answered {status}")]
    Status { uri: String, status: u16 },

    #[error("callback {uri} unreachable: {message}")]
    Transport { uri: String, message: String },

    #[error("invalid delivery job: {message}")]
    InvalidJob { message: String },
}

impl From<DeliveryError> for QueueError {
    fn from(err: DeliveryError) -> Self {
        QueueError::Handler {
            message: err.to_string(),
        }
    }
}

/// One webhook call, as produced by the fan-out step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryJob {
    /// Subscriber callback.
    pub uri: String,
    /// Always `POST`.
    pub method: String,
    /// The event document.
    pub body: Value,
    /// Send the body as JSON.
    pub json: bool,
    /// The matching hub.
    pub hub_id: String,
}

impl DeliveryJob {
    /// A JSON POST of `body` to `uri`.
    pub fn post(uri: impl Into<String>, body: Value, hub_id: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            method: "POST".to_string(),
            body,
            json: true,
            hub_id: hub_id.into(),
        }
    }
}

/// Sends a webhook body to a callback.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// POSTs `body` as JSON to `uri`. Any non-2xx answer is an error.
    async fn post(&self, uri: &str, body: &Value) -> Result<(), DeliveryError>;
}

/// HTTP transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tmf-broker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DeliveryError::Transport {
                uri: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn post(&self, uri: &str, body: &Value) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(uri)
            .json(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport {
                uri: uri.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status {
                uri: uri.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

/// Consumer for the subscription topic.
pub struct DeliveryWorker {
    transport: Arc<dyn WebhookTransport>,
}

impl DeliveryWorker {
    /// Creates a worker that sends through `transport`.
    pub fn new(transport: Arc<dyn WebhookTransport>) -> Self {
        Self { transport }
    }

    /// Performs one delivery.
    pub async fn deliver(&self, job: &DeliveryJob) -> Result<(), DeliveryError> {
        if !job.method.eq_ignore_ascii_case("POST") {
            return Err(DeliveryError::InvalidJob {
                message: format!("unsupported method {}", job.method),
            });
        }
        self.transport.post(&job.uri, &job.body).await
    }
}

#[async_trait]
impl MessageHandler for DeliveryWorker {
    async fn handle(&self, message: &QueueMessage) -> QueueResult<()> {
        let job: DeliveryJob = match message.decode() {
            Ok(job) => job,
            Err(e) => {
                // Retrying cannot fix a malformed job.
                warn!(message_id = %message.id, error = %e, "Discarding malformed delivery job");
                return Ok(());
            }
        };

        match self.deliver(&job).await {
            Ok(()) => {
                debug!(hub_id = %job.hub_id, uri = %job.uri, attempt = message.attempt, "Webhook delivered");
                Ok(())
            }
            Err(DeliveryError::InvalidJob { message: reason }) => {
                warn!(hub_id = %job.hub_id, reason = %reason, "Discarding invalid delivery job");
                Ok(())
            }
            Err(e) => {
                warn!(hub_id = %job.hub_id, uri = %job.uri, attempt = message.attempt, error = %e, "Webhook delivery failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(String, Value)>>,
        fail_with: Option<u16>,
    }

    #[async_trait]
    impl WebhookTransport for Recording {
        async fn post(&self, uri: &str, body: &Value) -> Result<(), DeliveryError> {
            self.calls.lock().push((uri.to_string(), body.clone()));
            match self.fail_with {
                Some(status) => Err(DeliveryError::Status {
                    uri: uri.to_string(),
                    status,
                }),
                None => Ok(()),
            }
        }
    }

    fn message(job: &DeliveryJob) -> QueueMessage {
        QueueMessage::new("SUBSCRIPTION", serde_json::to_value(job).unwrap())
    }

    #[test]
    fn test_job_wire_shape() {
        let job = DeliveryJob::post("https://x/cb", json!({"eventId": "e1"}), "h1");
        assert_eq!(
            serde_json::to_value(&job).unwrap(),
            json!({
                "uri": "https://x/cb",
                "method": "POST",
                "body": {"eventId": "e1"},
                "json": true,
                "hubId": "h1"
            })
        );
    }

    #[tokio::test]
    async fn test_worker_posts_body() {
        let transport = Arc::new(Recording::default());
        let worker = DeliveryWorker::new(transport.clone());
        let job = DeliveryJob::post("https://x/cb", json!({"eventId": "e1"}), "h1");

        worker.handle(&message(&job)).await.unwrap();

        let calls = transport.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "https://x/cb");
        assert_eq!(calls[0].1, json!({"eventId": "e1"}));
    }

    #[tokio::test]
    async fn test_failed_post_fails_message() {
        let transport = Arc::new(Recording {
            fail_with: Some(503),
            ..Default::default()
        });
        let worker = DeliveryWorker::new(transport);
        let job = DeliveryJob::post("https://x/cb", json!({}), "h1");

        let err = worker.handle(&message(&job)).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_malformed_job_is_discarded() {
        let transport = Arc::new(Recording::default());
        let worker = DeliveryWorker::new(transport.clone());

        worker
            .handle(&QueueMessage::new("SUBSCRIPTION", json!({"uri": 5})))
            .await
            .unwrap();
        assert!(transport.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_non_post_job_is_discarded() {
        let transport = Arc::new(Recording::default());
        let worker = DeliveryWorker::new(transport.clone());
        let mut job = DeliveryJob::post("https://x/cb", json!({}), "h1");
        job.method = "DELETE".to_string();

        worker.handle(&message(&job)).await.unwrap();
        assert!(transport.calls.lock().is_empty());
    }
}
