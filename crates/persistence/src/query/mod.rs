//! Query construction and in-process evaluation.
//!
//! - [`QueryBuilder`] turns flat request arguments into a [`Query`](crate::types::Query)
//! - [`PathFilter`] is the post-filter language applied to returned rows
//! - [`parse_subscription_filter`] parses hub filters
//! - [`project`] and the functions in [`compare`] define the reference
//!   semantics backends must reproduce

mod builder;
pub mod compare;
mod filter;
mod projection;
mod subscription;

pub use builder::{
    DEFAULT_LIMIT, MANDATORY_FIELDS, MAX_LIMIT, QueryBuilder, add_mandatory_projection_fields,
    coerce,
};
pub use filter::PathFilter;
pub use projection::project;
pub use subscription::parse_subscription_filter;
