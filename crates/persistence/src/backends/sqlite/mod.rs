//! SQLite backend implementation.
//!
//! Documents of every resource type live in one `documents` table as JSON
//! text. Criteria are translated to `json_extract`/`json_type` expressions,
//! sorting to `ORDER BY json_extract(...)` with insertion order as the final
//! tie-breaker, and projection is applied to the decoded rows.
//!
//! # Example
//!
//! ```no_run
//! use tmf_persistence::backends::sqlite::SqliteBackend;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // In-memory database, schema initialized on construction
//! let backend = SqliteBackend::in_memory()?;
//!
//! // Or a file-based database
//! let backend = SqliteBackend::open("./data/broker.db")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE documents (
//!     seq INTEGER PRIMARY KEY AUTOINCREMENT,
//!     collection TEXT NOT NULL,
//!     id TEXT NOT NULL,
//!     data TEXT NOT NULL,
//!     UNIQUE (collection, id)
//! );
//! ```

mod backend;
mod query_builder;
mod schema;
mod storage;

pub use backend::{SqliteBackend, SqliteBackendConfig};
pub use query_builder::{SqlBuilder, SqlParam, json_path};
pub use schema::SCHEMA_VERSION;
