//! Persistence backend implementations.
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | SQLite | `sqlite` (default) | JSON documents in SQLite, file or in-memory |
//! | Memory | always | In-process document store |
//!
//! Both implement [`ResourceStore`](crate::core::ResourceStore) and pass the
//! same black-box suite.
//!
//! # Example
//!
//! ```no_run
//! use tmf_persistence::backends::memory::MemoryBackend;
//! # #[cfg(feature = "sqlite")]
//! use tmf_persistence::backends::sqlite::SqliteBackend;
//!
//! # #[cfg(feature = "sqlite")]
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let memory = MemoryBackend::new();
//! let sqlite = SqliteBackend::in_memory()?;
//! # Ok(())
//! # }
//! ```

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;
