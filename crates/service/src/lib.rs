//! # tmf-service - Resource Broker Business Logic
//!
//! This crate provides the business-logic layer of the TMF resource broker:
//! a single [`ResourceService`] that implements list, show, create, update,
//! patch and remove for every resource type in the schema registry, the
//! [`MonitorHandler`] used for asynchronous creates, and the event hub that
//! turns every mutation into webhook callbacks.
//!
//! ## Features
//!
//! - **One service, many types**: behavior is driven by the load-time
//!   [`SchemaRegistry`](tmf_persistence::SchemaRegistry)
//! - **Any backend**: runs on any [`ResourceStore`](tmf_persistence::ResourceStore)
//! - **Non-blocking notifications**: publishing never waits on fan-out or
//!   delivery
//! - **Async create**: `Prefer: respond-async` answers 202 with a Monitor link
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use tmf_persistence::backends::memory::MemoryBackend;
//! use tmf_persistence::SchemaRegistry;
//! use tmf_service::{NotificationPublisher, ResourceService, ServiceConfig};
//!
//! let config = ServiceConfig::default();
//! let (publisher, outbox) = NotificationPublisher::channel(config.outbox_capacity);
//! let service = ResourceService::new(
//!     Arc::new(MemoryBackend::new()),
//!     Arc::new(SchemaRegistry::embedded()),
//!     publisher,
//!     &config,
//! );
//! ```
//!
//! ## Notification Flow
//!
//! | Hop | Mechanism |
//! |-----|-----------|
//! | service → outbox | bounded channel, `try_send` |
//! | outbox → fan-out | `INTERNAL_EVENT` topic |
//! | fan-out → delivery | `SUBSCRIPTION` topic |
//! | delivery → subscriber | HTTP POST, retried with backoff |
//!
//! ## Response Headers
//!
//! - `Location` - show, create, update and patch, when the resource has an `href`
//! - `Link` - async create, pointing at the Monitor
//! - `X-Total-Count`, `X-Result-Count` - list
//! - `Content-Range` - partial (206) list responses

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod monitor;
pub mod notification;
pub mod payload;
pub mod response;
pub mod service;

pub use config::ServiceConfig;
pub use context::{PreferHeader, RequestArgs, RequestContext, RequestInfo};
pub use error::{ServiceError, ServiceResult};
pub use monitor::{MonitorHandler, MonitorRef};
pub use notification::{
    EventEnvelope, EventHub, EventHubHandle, HttpTransport, MemoryQueue, NotificationPublisher,
    Queue, WebhookTransport,
};
pub use response::ServiceResponse;
pub use service::ResourceService;

/// Initializes logging with the given level.
///
/// `RUST_LOG` takes precedence when set.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "tmf_service={level},tmf_persistence={level},tmf_broker={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
