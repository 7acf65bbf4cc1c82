//! Broker configuration.
//!
//! Every setting can be given on the command line or through a `TMF_*`
//! environment variable.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TMF_BASE_URL` | http://localhost:8080/tmf-api | Base used to derive `href` values |
//! | `TMF_LOG_LEVEL` | info | Log level |
//! | `TMF_STORAGE_BACKEND` | sqlite | Storage backend (sqlite, memory) |
//! | `TMF_DATABASE_URL` | broker.db | SQLite database path (`:memory:` allowed) |
//! | `TMF_DEFAULT_LIMIT` | 100 | Page size when a list names none |
//! | `TMF_MAX_LIMIT` | 1000 | Page size ceiling |
//! | `TMF_INTERNAL_EVENT_TOPIC` | INTERNAL_EVENT | Topic between publisher and fan-out |
//! | `TMF_SUBSCRIPTION_TOPIC` | SUBSCRIPTION | Topic between fan-out and delivery |
//! | `TMF_OUTBOX_CAPACITY` | 1024 | Bounded publisher outbox size |
//! | `TMF_FAN_OUT_WORKERS` | 2 | Concurrent fan-out consumers |
//! | `TMF_DELIVERY_WORKERS` | 4 | Concurrent webhook delivery consumers |
//! | `TMF_DELIVERY_TIMEOUT_SECS` | 10 | Per-request webhook timeout |
//! | `TMF_DELIVERY_MAX_ATTEMPTS` | 5 | Delivery attempts before a job is dropped |
//! | `TMF_RETRY_INITIAL_BACKOFF_MS` | 500 | First retry delay |
//! | `TMF_RETRY_MAX_BACKOFF_MS` | 30000 | Retry delay ceiling |
//! | `TMF_FILL_REQUIRED_SAMPLES` | false | Generate sample values for missing required fields |
//! | `TMF_SCHEMA_PATH` | - | JSON file overriding embedded schemas |

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use tmf_persistence::BackendKind;
use tmf_persistence::query::{DEFAULT_LIMIT, MAX_LIMIT};

use crate::notification::RetryPolicy;

/// Configuration for the resource broker.
#[derive(Debug, Clone, Parser)]
#[command(name = "tmf-broker")]
#[command(about = "TMF resource broker")]
pub struct ServiceConfig {
    /// Public base URL; [`ResourceService::context`](crate::ResourceService::context)
    /// roots request contexts here, and resource `href` values derive from it.
    #[arg(long, env = "TMF_BASE_URL", default_value = "http://localhost:8080/tmf-api")]
    pub base_url: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "TMF_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Storage backend (sqlite, memory).
    #[arg(long, env = "TMF_STORAGE_BACKEND", default_value = "sqlite")]
    pub storage_backend: String,

    /// SQLite database path.
    #[arg(long, env = "TMF_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Page size when a list request names none.
    #[arg(long, env = "TMF_DEFAULT_LIMIT", default_value = "100")]
    pub default_limit: u64,

    /// Page size ceiling.
    #[arg(long, env = "TMF_MAX_LIMIT", default_value = "1000")]
    pub max_limit: u64,

    /// Topic carrying published events to the fan-out workers.
    #[arg(long, env = "TMF_INTERNAL_EVENT_TOPIC", default_value = "INTERNAL_EVENT")]
    pub internal_event_topic: String,

    /// Topic carrying webhook jobs to the delivery workers.
    #[arg(long, env = "TMF_SUBSCRIPTION_TOPIC", default_value = "SUBSCRIPTION")]
    pub subscription_topic: String,

    /// Capacity of the publisher outbox.
    #[arg(long, env = "TMF_OUTBOX_CAPACITY", default_value = "1024")]
    pub outbox_capacity: usize,

    /// Number of fan-out workers.
    #[arg(long, env = "TMF_FAN_OUT_WORKERS", default_value = "2")]
    pub fan_out_workers: usize,

    /// Number of delivery workers.
    #[arg(long, env = "TMF_DELIVERY_WORKERS", default_value = "4")]
    pub delivery_workers: usize,

    /// Webhook request timeout in seconds.
    #[arg(long, env = "TMF_DELIVERY_TIMEOUT_SECS", default_value = "10")]
    pub delivery_timeout_secs: u64,

    /// Delivery attempts before a job is dropped.
    #[arg(long, env = "TMF_DELIVERY_MAX_ATTEMPTS", default_value = "5")]
    pub delivery_max_attempts: u32,

    /// First retry delay in milliseconds.
    #[arg(long, env = "TMF_RETRY_INITIAL_BACKOFF_MS", default_value = "500")]
    pub retry_initial_backoff_ms: u64,

    /// Retry delay ceiling in milliseconds.
    #[arg(long, env = "TMF_RETRY_MAX_BACKOFF_MS", default_value = "30000")]
    pub retry_max_backoff_ms: u64,

    /// Fill missing required properties with generated sample values on create.
    #[arg(long, env = "TMF_FILL_REQUIRED_SAMPLES", default_value = "false")]
    pub fill_required_samples: bool,

    /// JSON file with schema overrides.
    #[arg(long, env = "TMF_SCHEMA_PATH")]
    pub schema_path: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/tmf-api".to_string(),
            log_level: "info".to_string(),
            storage_backend: "sqlite".to_string(),
            database_url: None,
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
            internal_event_topic: "INTERNAL_EVENT".to_string(),
            subscription_topic: "SUBSCRIPTION".to_string(),
            outbox_capacity: 1024,
            fan_out_workers: 2,
            delivery_workers: 4,
            delivery_timeout_secs: 10,
            delivery_max_attempts: 5,
            retry_initial_backoff_ms: 500,
            retry_max_backoff_ms: 30_000,
            fill_required_samples: false,
            schema_path: None,
        }
    }
}

impl ServiceConfig {
    /// Creates a configuration from environment variables only.
    pub fn from_env() -> Self {
        Self::try_parse_from(["tmf-broker"]).unwrap_or_default()
    }

    /// Parses the configured storage backend.
    pub fn storage_backend_kind(&self) -> Result<BackendKind, String> {
        self.storage_backend.parse()
    }

    /// Returns the SQLite database path.
    pub fn database_path(&self) -> &str {
        self.database_url.as_deref().unwrap_or("broker.db")
    }

    /// Returns the webhook request timeout.
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    /// Returns the queue retry policy for webhook delivery.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.delivery_max_attempts,
            initial_backoff: Duration::from_millis(self.retry_initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry_max_backoff_ms),
        }
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(e) = self.storage_backend_kind() {
            errors.push(e);
        }

        match url::Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(format!("Base URL '{}' is not an http(s) URL", self.base_url)),
        }

        if self.max_limit == 0 {
            errors.push("Max limit cannot be 0".to_string());
        }

        if self.default_limit > self.max_limit {
            errors.push("Default limit cannot exceed max limit".to_string());
        }

        if self.outbox_capacity == 0 {
            errors.push("Outbox capacity cannot be 0".to_string());
        }

        if self.fan_out_workers == 0 || self.delivery_workers == 0 {
            errors.push("Worker counts cannot be 0".to_string());
        }

        if self.delivery_max_attempts == 0 {
            errors.push("Delivery max attempts cannot be 0".to_string());
        }

        if self.retry_initial_backoff_ms > self.retry_max_backoff_ms {
            errors.push("Initial retry backoff cannot exceed max backoff".to_string());
        }

        if self.internal_event_topic == self.subscription_topic {
            errors.push("Internal event and subscription topics must differ".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Uses the memory backend, one worker of each kind and short retries.
    pub fn for_testing() -> Self {
        Self {
            base_url: "http://localhost/tmf-api".to_string(),
            log_level: "debug".to_string(),
            storage_backend: "memory".to_string(),
            outbox_capacity: 64,
            fan_out_workers: 1,
            delivery_workers: 1,
            delivery_timeout_secs: 1,
            delivery_max_attempts: 3,
            retry_initial_backoff_ms: 10,
            retry_max_backoff_ms: 100,
            ..Default::default()
        }
    }
}
