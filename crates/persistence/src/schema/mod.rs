//! Resource schema registry.
//!
//! Every resource type the broker serves has a [`ResourceSchema`] describing
//! its property types, required fields, id generation and the optional
//! contracts (partial content, async create) its API declares. The registry
//! is built once at startup and read through the typed accessor
//! [`SchemaRegistry::get`].

mod definition;
mod errors;
mod loader;
mod registry;
mod resource_type;

pub use definition::{AsyncContract, DefaultRule, IdKind, PropertyType, ResourceSchema};
pub use errors::SchemaError;
pub use loader::SchemaLoader;
pub use registry::SchemaRegistry;
pub use resource_type::ResourceType;
