//! The backend contract.
//!
//! [`ResourceStore`] is the interface every persistence engine implements.
//! The acceptance bar for an implementation is the black-box suite in this
//! crate's `tests/` directory: the same [`Query`] against the same fixture
//! data must produce the same [`Page`] on every backend.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{StorageError, StorageResult, ValidationError};
use crate::schema::ResourceType;
use crate::types::{Page, Query};

use super::BackendKind;

/// Document storage for all resource types.
///
/// Documents are JSON objects carrying an `id`. Operations that address an
/// existing document (`find_one`, `update`, `patch`, `remove`) act on the
/// first document matching the query criteria in insertion order.
///
/// # Errors
///
/// Implementations map engine failures onto [`StorageError`] before
/// returning; [`StorageError::kind`] is what callers branch on.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Returns a human-readable name for this backend.
    fn backend_name(&self) -> &'static str;

    /// Returns the kind of backend.
    fn kind(&self) -> BackendKind;

    /// Returns the page of documents matching the query.
    ///
    /// Criteria, sorting, skip/limit and projection are applied in that
    /// order. `total` counts every match, before skip and limit.
    async fn find_many(&self, resource_type: ResourceType, query: &Query) -> StorageResult<Page>;

    /// Returns the first matching document, projected.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - if nothing matches
    async fn find_one(&self, resource_type: ResourceType, query: &Query) -> StorageResult<Value>;

    /// Stores a new document and returns it.
    ///
    /// # Errors
    ///
    /// * `StorageError::Validation` - if the document is not an object with an `id`
    /// * `StorageError::Resource(AlreadyExists)` - if the id is taken
    async fn create(&self, resource_type: ResourceType, doc: Value) -> StorageResult<Value>;

    /// Replaces the matching document, keeping its `id`.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - if nothing matches; never upserts
    async fn update(
        &self,
        resource_type: ResourceType,
        query: &Query,
        doc: Value,
    ) -> StorageResult<Value>;

    /// Applies an RFC 7386 merge patch to the matching document.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - if nothing matches; never upserts
    async fn patch(
        &self,
        resource_type: ResourceType,
        query: &Query,
        partial: Value,
    ) -> StorageResult<Value>;

    /// Deletes the matching document and returns it.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - if nothing matches
    async fn remove(&self, resource_type: ResourceType, query: &Query) -> StorageResult<Value>;

    /// Checks that the backend is reachable.
    async fn health_check(&self) -> StorageResult<()>;
}

/// Returns the canonical text of a document's `id`.
///
/// String ids are used as-is and numeric ids in their decimal form.
pub fn document_id(doc: &Value) -> StorageResult<String> {
    match doc.get("id") {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(ValidationError::InvalidResource {
            message: "id must be a non-empty string or a number".to_string(),
        }
        .into()),
        None => Err(ValidationError::MissingRequiredField {
            field: "id".to_string(),
        }
        .into()),
    }
}

/// Rejects anything that is not a JSON object.
pub fn ensure_object(doc: &Value) -> StorageResult<()> {
    if doc.is_object() {
        Ok(())
    } else {
        Err(ValidationError::InvalidResource {
            message: "document must be a JSON object".to_string(),
        }
        .into())
    }
}

/// Builds the merged document for a patch, keeping the stored `id`.
pub fn merge_document(current: &Value, partial: &Value) -> StorageResult<Value> {
    ensure_object(partial)?;
    let mut merged = current.clone();
    json_patch::merge(&mut merged, partial);
    restore_id(&mut merged, current);
    Ok(merged)
}

/// Builds the replacement document for an update, keeping the stored `id`.
pub fn replace_document(current: &Value, replacement: Value) -> StorageResult<Value> {
    ensure_object(&replacement)?;
    let mut replaced = replacement;
    restore_id(&mut replaced, current);
    Ok(replaced)
}

fn restore_id(target: &mut Value, current: &Value) {
    if let (Some(map), Some(id)) = (target.as_object_mut(), current.get("id")) {
        map.insert("id".to_string(), id.clone());
    }
}

/// Shorthand for the not-found error of a query that matched nothing.
pub fn no_match(resource_type: ResourceType, query: &Query) -> StorageError {
    let id = query
        .id_value()
        .map(ToString::to_string)
        .unwrap_or_else(|| "<query>".to_string());
    StorageError::not_found(resource_type.as_str(), id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;
    use serde_json::json;

    #[test]
    fn test_document_id() {
        assert_eq!(document_id(&json!({"id": "abc"})).unwrap(), "abc");
        assert_eq!(document_id(&json!({"id": 42})).unwrap(), "42");
        assert!(document_id(&json!({"id": ""})).is_err());
        assert!(document_id(&json!({"name": "x"})).is_err());
    }

    #[test]
    fn test_merge_keeps_id_and_removes_nulls() {
        let current = json!({"id": "1", "name": "a", "state": "active"});
        let merged = merge_document(&current, &json!({"id": "2", "state": null, "note": []})).unwrap();
        assert_eq!(merged, json!({"id": "1", "name": "a", "note": []}));
    }

    #[test]
    fn test_replace_keeps_id() {
        let current = json!({"id": "1", "name": "a"});
        let replaced = replace_document(&current, json!({"name": "b"})).unwrap();
        assert_eq!(replaced, json!({"id": "1", "name": "b"}));
        assert!(replace_document(&current, json!([1])).is_err());
    }

    #[test]
    fn test_no_match_names_the_id() {
        let err = no_match(ResourceType::Service, &Query::by_id(FieldValue::from("x1")));
        assert_eq!(err.to_string(), "resource not found: Service/x1");
    }
}
