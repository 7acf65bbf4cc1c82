//! Core types for queries and results.
//!
//! - [`FieldValue`] - typed scalar compared by a condition
//! - [`Condition`], [`Criteria`], [`SortDirective`], [`QueryOptions`], [`Query`] -
//!   the backend-neutral query model
//! - [`Page`] - a page of documents with the pre-pagination total

mod page;
mod query;
mod value;

pub use page::Page;
pub use query::{
    Condition, Criteria, OPERATOR_SUFFIXES, Query, QueryOptions, SortDirection, SortDirective,
};
pub use value::{FieldValue, format_datetime, parse_datetime};
