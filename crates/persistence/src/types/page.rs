//! Result page returned by `find_many`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of documents plus the size of the full match set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// The documents on this page, after skip/limit and projection.
    pub rows: Vec<Value>,
    /// Number of documents matching the criteria before skip/limit.
    pub total: u64,
}

impl Page {
    /// Creates a page.
    pub fn new(rows: Vec<Value>, total: u64) -> Self {
        Self { rows, total }
    }

    /// Number of rows on this page.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the page holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns true when more documents matched than were returned.
    pub fn is_partial(&self) -> bool {
        (self.rows.len() as u64) < self.total
    }
}
