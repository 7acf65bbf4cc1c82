//! In-process document store backend.
//!
//! Evaluates queries in Rust using the reference semantics in
//! [`crate::query::compare`]. Useful for tests and single-process
//! deployments where durability is not needed.

mod backend;

pub use backend::MemoryBackend;
