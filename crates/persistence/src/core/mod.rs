//! Core storage abstractions.
//!
//! - [`ResourceStore`] - the contract every backend implements
//! - [`BackendKind`] - backend identification for configuration and logging
//! - document helpers shared by backend implementations

mod backend;
mod storage;

pub use backend::BackendKind;
pub use storage::{
    ResourceStore, document_id, ensure_object, merge_document, no_match, replace_document,
};
