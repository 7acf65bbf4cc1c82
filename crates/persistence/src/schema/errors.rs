//! Schema registry errors.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use super::ResourceType;

/// Errors raised while building or loading the schema registry.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// A schema for this type is already registered.
    #[error("schema already registered for {resource_type}")]
    Duplicate { resource_type: ResourceType },

    /// The name does not correspond to any resource type.
    #[error("unknown resource type: {name}")]
    UnknownResourceType { name: String },

    /// The schema document could not be parsed.
    #[error("failed to parse schema document: {message}")]
    Parse { message: String },

    /// The schema file could not be read or parsed.
    #[error("failed to load schema file {path}: {message}")]
    ConfigLoadFailed { path: String, message: String },
}
