//! [`ResourceStore`] implementation for SQLite.

use async_trait::async_trait;
use rusqlite::{OptionalExtension, TransactionBehavior, params, params_from_iter};
use serde_json::Value;
use tracing::debug;

use crate::core::{
    BackendKind, ResourceStore, document_id, ensure_object, merge_document, no_match,
    replace_document,
};
use crate::error::{ResourceError, StorageError, StorageResult};
use crate::query::project;
use crate::schema::ResourceType;
use crate::types::{Page, Query};

use super::SqliteBackend;
use super::query_builder::SqlBuilder;

fn parse_document(data: &str) -> StorageResult<Value> {
    Ok(serde_json::from_str(data)?)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl SqliteBackend {
    /// Applies a read-modify-write to the first matching document inside
    /// one immediate transaction.
    fn modify<F>(&self, resource_type: ResourceType, query: &Query, f: F) -> StorageResult<Value>
    where
        F: FnOnce(&Value) -> StorageResult<Value>,
    {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (seq, current) = {
            let mut builder = SqlBuilder::new();
            let where_clause = builder.where_clause(&resource_type.collection(), &query.criteria);
            let sql = format!(
                "SELECT seq, data FROM documents WHERE {} ORDER BY seq ASC LIMIT 1",
                where_clause
            );
            tx.query_row(&sql, params_from_iter(builder.params()), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .optional()?
            .ok_or_else(|| no_match(resource_type, query))?
        };

        let next = f(&parse_document(&current)?)?;
        tx.execute(
            "UPDATE documents SET data = ?1 WHERE seq = ?2",
            params![serde_json::to_string(&next)?, seq],
        )?;
        tx.commit()?;
        Ok(next)
    }
}

#[async_trait]
impl ResourceStore for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    async fn find_many(&self, resource_type: ResourceType, query: &Query) -> StorageResult<Page> {
        let conn = self.get_connection()?;

        let mut builder = SqlBuilder::new();
        let where_clause = builder.where_clause(&resource_type.collection(), &query.criteria);
        let count_params = builder.params().to_vec();

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM documents WHERE {}", where_clause),
            params_from_iter(count_params.iter()),
            |row| row.get(0),
        )?;

        let order_by = builder.order_by(&query.sorting);
        let limit = builder.limit_offset(query.options.limit, query.options.skip);
        let sql = format!(
            "SELECT data FROM documents WHERE {} ORDER BY {} {}",
            where_clause, order_by, limit
        );
        debug!(resource_type = %resource_type, sql = %sql, "sqlite find_many");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(builder.params()), |row| row.get::<_, String>(0))?
            .map(|data| {
                let doc = parse_document(&data?)?;
                Ok(project(&doc, &query.options.projection))
            })
            .collect::<StorageResult<Vec<_>>>()?;

        Ok(Page::new(rows, u64::try_from(total).unwrap_or(0)))
    }

    async fn find_one(&self, resource_type: ResourceType, query: &Query) -> StorageResult<Value> {
        let conn = self.get_connection()?;

        let mut builder = SqlBuilder::new();
        let where_clause = builder.where_clause(&resource_type.collection(), &query.criteria);
        let sql = format!(
            "SELECT data FROM documents WHERE {} ORDER BY seq ASC LIMIT 1",
            where_clause
        );

        let data: Option<String> = conn
            .query_row(&sql, params_from_iter(builder.params()), |row| row.get(0))
            .optional()?;
        let doc = parse_document(&data.ok_or_else(|| no_match(resource_type, query))?)?;
        Ok(project(&doc, &query.options.projection))
    }

    async fn create(&self, resource_type: ResourceType, doc: Value) -> StorageResult<Value> {
        ensure_object(&doc)?;
        let id = document_id(&doc)?;
        let data = serde_json::to_string(&doc)?;

        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO documents (collection, id, data) VALUES (?1, ?2, ?3)",
            params![resource_type.collection(), id, data],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Resource(ResourceError::AlreadyExists {
                    resource_type: resource_type.to_string(),
                    id: id.clone(),
                })
            } else {
                StorageError::from(e)
            }
        })?;

        debug!(resource_type = %resource_type, id = %id, "sqlite create");
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
        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (seq, data) = {
            let mut builder = SqlBuilder::new();
            let where_clause = builder.where_clause(&resource_type.collection(), &query.criteria);
            let sql = format!(
                "SELECT seq, data FROM documents WHERE {} ORDER BY seq ASC LIMIT 1",
                where_clause
            );
            tx.query_row(&sql, params_from_iter(builder.params()), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .optional()?
            .ok_or_else(|| no_match(resource_type, query))?
        };

        tx.execute("DELETE FROM documents WHERE seq = ?1", params![seq])?;
        tx.commit()?;
        parse_document(&data)
    }

    async fn health_check(&self) -> StorageResult<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}
