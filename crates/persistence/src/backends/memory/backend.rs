//! Memory backend implementation.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::core::{
    BackendKind, ResourceStore, document_id, ensure_object, merge_document, no_match,
    replace_document,
};
use crate::error::{ResourceError, StorageResult};
use crate::query::compare::{document_matches, resolve_path, sort_cmp};
use crate::query::project;
use crate::schema::ResourceType;
use crate::types::{Page, Query, SortDirection};

/// Documents of one resource type, in insertion order.
#[derive(Debug, Default)]
struct Collection {
    docs: BTreeMap<u64, Value>,
    ids: HashMap<String, u64>,
}

impl Collection {
    fn first_match(&self, query: &Query) -> Option<u64> {
        self.docs
            .iter()
            .find(|(_, doc)| document_matches(doc, query.criteria.iter()))
            .map(|(seq, _)| *seq)
    }
}

/// Document store held entirely in memory.
#[derive(Default)]
pub struct MemoryBackend {
    collections: RwLock<HashMap<ResourceType, Collection>>,
    next_seq: AtomicU64,
}

impl Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let collections = self.collections.read();
        f.debug_struct("MemoryBackend")
            .field("collections", &collections.len())
            .field(
                "documents",
                &collections.values().map(|c| c.docs.len()).sum::<usize>(),
            )
            .finish()
    }
}

impl MemoryBackend {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents stored for a type.
    pub fn len(&self, resource_type: ResourceType) -> usize {
        self.collections
            .read()
            .get(&resource_type)
            .map_or(0, |c| c.docs.len())
    }

    /// Returns true if no documents of the type are stored.
    pub fn is_empty(&self, resource_type: ResourceType) -> bool {
        self.len(resource_type) == 0
    }

    fn sequence(&self) -> u64 {
        self.next_seq.fetch_add(1, AtomicOrdering::SeqCst)
    }

    /// Applies a read-modify-write to the first matching document.
    fn modify<F>(&self, resource_type: ResourceType, query: &Query, f: F) -> StorageResult<Value>
    where
        F: FnOnce(&Value) -> StorageResult<Value>,
    {
        let mut collections = self.collections.write();
        let collection = collections
            .get_mut(&resource_type)
            .ok_or_else(|| no_match(resource_type, query))?;
        let seq = collection
            .first_match(query)
            .ok_or_else(|| no_match(resource_type, query))?;

        let current = collection
            .docs
            .get(&seq)
            .ok_or_else(|| no_match(resource_type, query))?;
        let next = f(current)?;
        collection.docs.insert(seq, next.clone());
        Ok(next)
    }
}

#[async_trait]
impl ResourceStore for MemoryBackend {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn find_many(&self, resource_type: ResourceType, query: &Query) -> StorageResult<Page> {
        let collections = self.collections.read();
        let Some(collection) = collections.get(&resource_type) else {
            return Ok(Page::default());
        };

        let mut matches: Vec<&Value> = collection
            .docs
            .values()
            .filter(|doc| document_matches(doc, query.criteria.iter()))
            .collect();
        let total = matches.len() as u64;

        if !query.sorting.is_empty() {
            // Stable sort keeps insertion order among ties.
            matches.sort_by(|a, b| {
                query
                    .sorting
                    .iter()
                    .map(|directive| {
                        let ordering = sort_cmp(
                            resolve_path(a, &directive.field),
                            resolve_path(b, &directive.field),
                        );
                        match directive.direction {
                            SortDirection::Ascending => ordering,
                            SortDirection::Descending => ordering.reverse(),
                        }
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let skip = usize::try_from(query.options.skip).unwrap_or(usize::MAX);
        let limit = query
            .options
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        let rows = matches
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| project(doc, &query.options.projection))
            .collect();

        debug!(resource_type = %resource_type, total, "memory find_many");
        Ok(Page::new(rows, total))
    }

    async fn find_one(&self, resource_type: ResourceType, query: &Query) -> StorageResult<Value> {
        let collections = self.collections.read();
        collections
            .get(&resource_type)
            .and_then(|collection| {
                collection
                    .first_match(query)
                    .and_then(|seq| collection.docs.get(&seq))
            })
            .map(|doc| project(doc, &query.options.projection))
            .ok_or_else(|| no_match(resource_type, query))
    }

    async fn create(&self, resource_type: ResourceType, doc: Value) -> StorageResult<Value> {
        ensure_object(&doc)?;
        let id = document_id(&doc)?;

        let mut collections = self.collections.write();
        let collection = collections.entry(resource_type).or_default();
        if collection.ids.contains_key(&id) {
            return Err(ResourceError::AlreadyExists {
                resource_type: resource_type.to_string(),
                id,
            }
            .into());
        }

        let seq = self.sequence();
        collection.ids.insert(id.clone(), seq);
        collection.docs.insert(seq, doc.clone());
        debug!(resource_type = %resource_type, id = %id, "memory create");
        Ok(doc)
    }

    async fn update(
        &self,
        resource_type: ResourceType,
        query: &Query,
        doc: Value,
    ) -> StorageResult<Value> {
        self.modify(resource_type, query, |current| replace_document(current, doc))
    }

    async fn patch(
        &self,
        resource_type: ResourceType,
        query: &Query,
        partial: Value,
    ) -> StorageResult<Value> {
        self.modify(resource_type, query, |current| {
            merge_document(current, &partial)
        })
    }

    async fn remove(&self, resource_type: ResourceType, query: &Query) -> StorageResult<Value> {
        let mut collections = self.collections.write();
        let collection = collections
            .get_mut(&resource_type)
            .ok_or_else(|| no_match(resource_type, query))?;
        let seq = collection
            .first_match(query)
            .ok_or_else(|| no_match(resource_type, query))?;
        let doc = collection
            .docs
            .remove(&seq)
            .ok_or_else(|| no_match(resource_type, query))?;
        if let Ok(id) = document_id(&doc) {
            collection.ids.remove(&id);
        }
        Ok(doc)
    }

    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
