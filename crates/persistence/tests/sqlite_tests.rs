//! SQLite backend integration tests.
//!
//! Query semantics are covered by `query_contract_tests`; these tests cover
//! what only the SQLite backend has: files, reopening and pooled writers.

use std::sync::Arc;

use serde_json::json;

use tmf_persistence::ResourceStore;
use tmf_persistence::backends::sqlite::{SqliteBackend, SqliteBackendConfig};
use tmf_persistence::error::{ErrorKind, ResourceError, StorageError};
use tmf_persistence::schema::ResourceType;
use tmf_persistence::types::{Condition, FieldValue, Query, SortDirective};

fn create_backend() -> SqliteBackend {
    SqliteBackend::in_memory().expect("Failed to create SQLite backend")
}

// ============================================================================
// Create Tests
// ============================================================================

#[tokio::test]
async fn test_create_returns_stored_document() {
    let backend = create_backend();
    let doc = json!({"id": "s1", "name": "Fiber", "relatedParty": [{"id": "p1"}]});

    let created = backend
        .create(ResourceType::Service, doc.clone())
        .await
        .unwrap();
    assert_eq!(created, doc);
}

#[tokio::test]
async fn test_create_duplicate_id_conflicts() {
    let backend = create_backend();
    backend
        .create(ResourceType::Service, json!({"id": "s1"}))
        .await
        .unwrap();

    let err = backend
        .create(ResourceType::Service, json!({"id": "s1"}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Resource(ResourceError::AlreadyExists { .. })
    ));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_same_id_in_different_collections() {
    let backend = create_backend();
    backend
        .create(ResourceType::Service, json!({"id": "1"}))
        .await
        .unwrap();
    backend
        .create(ResourceType::ServiceOrder, json!({"id": "1"}))
        .await
        .unwrap();

    let removed = backend
        .remove(ResourceType::Service, &Query::by_id("1".into()))
        .await
        .unwrap();
    assert_eq!(removed["id"], "1");

    let order = backend
        .find_one(ResourceType::ServiceOrder, &Query::by_id("1".into()))
        .await
        .unwrap();
    assert_eq!(order["id"], "1");
}

#[tokio::test]
async fn test_numeric_ids() {
    let backend = create_backend();
    backend
        .create(ResourceType::ServiceCatalog, json!({"id": 42, "name": "main"}))
        .await
        .unwrap();

    let found = backend
        .find_one(
            ResourceType::ServiceCatalog,
            &Query::by_id(FieldValue::Integer(42)),
        )
        .await
        .unwrap();
    assert_eq!(found["name"], "main");
}

#[tokio::test]
async fn test_unicode_and_symbol_keys() {
    let backend = create_backend();
    backend
        .create(
            ResourceType::Service,
            json!({"id": "u1", "name": "Glasfaser Zürich", "@type": "Service"}),
        )
        .await
        .unwrap();

    let page = backend
        .find_many(
            ResourceType::Service,
            &Query::new().with_condition("@type", Condition::Eq("Service".into())),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0]["name"], "Glasfaser Zürich");
}

// ============================================================================
// File Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_documents_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broker.db");

    {
        let backend = SqliteBackend::open(&path).unwrap();
        for (id, name) in [("s1", "one"), ("s2", "two")] {
            backend
                .create(ResourceType::Service, json!({"id": id, "name": name}))
                .await
                .unwrap();
        }
        backend
            .patch(
                ResourceType::Service,
                &Query::by_id("s2".into()),
                json!({"state": "active"}),
            )
            .await
            .unwrap();
    }

    let backend = SqliteBackend::open(&path).unwrap();
    let page = backend
        .find_many(
            ResourceType::Service,
            &Query::new().with_sort(SortDirective::desc("name")),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.rows[0], json!({"id": "s2", "name": "two", "state": "active"}));
    assert_eq!(page.rows[1], json!({"id": "s1", "name": "one"}));
}

#[tokio::test]
async fn test_reopen_keeps_insertion_order_for_ties() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broker.db");

    {
        let backend = SqliteBackend::open(&path).unwrap();
        for id in ["c", "a", "b"] {
            backend
                .create(ResourceType::Hub, json!({"id": id, "callback": "http://x"}))
                .await
                .unwrap();
        }
    }

    let backend = SqliteBackend::open(&path).unwrap();
    let page = backend
        .find_many(
            ResourceType::Hub,
            &Query::new().with_sort(SortDirective::asc("callback")),
        )
        .await
        .unwrap();
    let ids: Vec<_> = page.rows.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, vec![json!("c"), json!("a"), json!("b")]);
}

#[tokio::test]
async fn test_concurrent_writers_on_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = SqliteBackendConfig {
        max_connections: 4,
        ..Default::default()
    };
    let backend =
        Arc::new(SqliteBackend::with_config(dir.path().join("broker.db"), config).unwrap());
    backend
        .create(ResourceType::Service, json!({"id": "s1", "tags": {}}))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let backend = Arc::clone(&backend);
        handles.push(tokio::spawn(async move {
            backend
                .patch(
                    ResourceType::Service,
                    &Query::by_id("s1".into()),
                    json!({"tags": {format!("t{}", i): true}}),
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let doc = backend
        .find_one(ResourceType::Service, &Query::by_id("s1".into()))
        .await
        .unwrap();
    assert_eq!(doc["tags"].as_object().unwrap().len(), 8);
}

// ============================================================================
// Health Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let backend = create_backend();
    assert!(backend.health_check().await.is_ok());
    assert_eq!(backend.backend_name(), "sqlite");
}
