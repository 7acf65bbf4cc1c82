//! TMF Broker Persistence Layer
//!
//! This crate provides the backend-neutral query model, the resource schema
//! registry and the storage contract the broker's business logic runs on,
//! together with the reference backends that implement it.
//!
//! # Features
//!
//! - **Backend-neutral queries**: criteria, sorting, paging and projection
//!   expressed once and translated by every backend
//! - **Schema registry**: typed, load-time schemas keyed by resource type
//! - **Interchangeable backends**: SQLite and in-memory, proven equivalent by
//!   a shared black-box suite
//!
//! # Backend Features
//!
//! - `sqlite` (default) - SQLite with in-memory and file modes
//!
//! The memory backend is always available.
//!
//! # Architecture
//!
//! - [`types`] - Query, condition, value and page types
//! - [`query`] - Building queries from request arguments, post-filters, projection
//! - [`schema`] - Resource types and their schemas
//! - [`core`] - The [`ResourceStore`] contract
//! - [`backends`] - Backend implementations
//! - [`error`] - Error types for all operations
//!
//! # Quick Start
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use tmf_persistence::query::{QueryBuilder, add_mandatory_projection_fields};
//! use tmf_persistence::schema::{ResourceType, SchemaRegistry};
//! use tmf_persistence::types::{Condition, FieldValue};
//!
//! let registry = SchemaRegistry::embedded();
//! let schema = registry.get(ResourceType::Service).unwrap();
//!
//! let mut args = BTreeMap::new();
//! args.insert("state".to_string(), "active".to_string());
//! args.insert("fields".to_string(), "name".to_string());
//! args.insert("limit".to_string(), "10".to_string());
//!
//! let query = QueryBuilder::default().build(&args, schema).unwrap();
//! let query = add_mandatory_projection_fields(query, schema);
//!
//! assert_eq!(
//!     query.criteria.get("state"),
//!     Some(&vec![Condition::Eq(FieldValue::from("active"))])
//! );
//! assert!(query.options.projection.contains("id"));
//! assert_eq!(query.options.limit, Some(10));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod error;
pub mod query;
pub mod schema;
pub mod types;

// Re-export commonly used types at crate root
pub use core::{BackendKind, ResourceStore};
pub use error::{ErrorKind, StorageError, StorageResult};
pub use schema::{ResourceSchema, ResourceType, SchemaRegistry};
pub use types::{Page, Query};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
