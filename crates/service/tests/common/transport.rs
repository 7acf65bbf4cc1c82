//! A webhook transport that records calls instead of sending them.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use tmf_service::notification::{DeliveryError, WebhookTransport};

/// One recorded POST.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Callback URI.
    pub uri: String,
    /// Posted body.
    pub body: Value,
}

/// Records every POST; callbacks can be set to fail a number of times.
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<Delivery>>,
    failures: Mutex<HashMap<String, u32>>,
}

impl RecordingTransport {
    /// Makes the next `times` POSTs to `uri` answer 503.
    pub fn fail(&self, uri: &str, times: u32) {
        self.failures.lock().insert(uri.to_string(), times);
    }

    /// Every call so far, including failed ones.
    pub fn calls(&self) -> Vec<Delivery> {
        self.calls.lock().clone()
    }

    /// Calls made to one callback.
    pub fn calls_to(&self, uri: &str) -> Vec<Delivery> {
        self.calls
            .lock()
            .iter()
            .filter(|d| d.uri == uri)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl WebhookTransport for RecordingTransport {
    async fn post(&self, uri: &str, body: &Value) -> Result<(), DeliveryError> {
        self.calls.lock().push(Delivery {
            uri: uri.to_string(),
            body: body.clone(),
        });

        let mut failures = self.failures.lock();
        if let Some(left) = failures.get_mut(uri) {
            if *left > 0 {
                *left -= 1;
                return Err(DeliveryError::Status {
                    uri: uri.to_string(),
                    status: 503,
                });
            }
        }
        Ok(())
    }
}
