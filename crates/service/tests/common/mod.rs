//! Test infrastructure for the service layer.

#![allow(dead_code)]

pub mod harness;
pub mod transport;

pub use harness::*;
pub use transport::*;
