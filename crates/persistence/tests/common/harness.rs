//! Backend harness.
//!
//! Every contract test runs against each backend returned by
//! [`backends`], so a new backend only has to be added here to be held to
//! the same behavior.

use std::sync::Arc;

use tmf_persistence::ResourceStore;
use tmf_persistence::backends::memory::MemoryBackend;
use tmf_persistence::backends::sqlite::SqliteBackend;
use tmf_persistence::schema::ResourceType;

use super::fixtures::services;

/// A named backend under test.
pub struct TestBackend {
    /// Name for assertion messages.
    pub name: &'static str,
    /// The store.
    pub store: Arc<dyn ResourceStore>,
}

/// Returns one empty instance of every backend.
pub fn backends() -> Vec<TestBackend> {
    vec![
        TestBackend {
            name: "memory",
            store: Arc::new(MemoryBackend::new()),
        },
        TestBackend {
            name: "sqlite",
            store: Arc::new(SqliteBackend::in_memory().expect("Failed to create SQLite backend")),
        },
    ]
}

/// Returns every backend loaded with the service fixtures.
pub async fn seeded_backends() -> Vec<TestBackend> {
    let backends = backends();
    for backend in &backends {
        for fixture in services() {
            backend
                .store
                .create(ResourceType::Service, fixture.to_json())
                .await
                .unwrap_or_else(|e| panic!("{}: seeding failed: {}", backend.name, e));
        }
    }
    backends
}
