//! The resource service.
//!
//! One [`ResourceService`] serves every resource type. Each verb is a single
//! request/response cycle with no state kept between calls:
//!
//! | Verb | Method | Success |
//! |------|--------|---------|
//! | [`index`](ResourceService::index) | `GET [base]/[type]` | 200 / 206 |
//! | [`show`](ResourceService::show) | `GET [base]/[type]/[id]` | 200 |
//! | [`create`](ResourceService::create) | `POST [base]/[type]` | 201 / 202 |
//! | [`update`](ResourceService::update) | `PUT [base]/[type]/[id]` | 200 |
//! | [`patch`](ResourceService::patch) | `PATCH [base]/[type]/[id]` | 200 |
//! | [`remove`](ResourceService::remove) | `DELETE [base]/[type]/[id]` | 204 |
//! | [`register_hub`](ResourceService::register_hub) | `POST [base]/hub` | 201 |
//! | [`unregister_hub`](ResourceService::unregister_hub) | `DELETE [base]/hub/[id]` | 204 |

mod create;
mod hub;
mod list;
mod remove;
mod show;
mod update;

use std::sync::Arc;

use http::Method;
use serde_json::Value;

use tmf_persistence::core::ResourceStore;
use tmf_persistence::query::{QueryBuilder, add_mandatory_projection_fields};
use tmf_persistence::schema::{IdKind, ResourceSchema, ResourceType, SchemaRegistry};
use tmf_persistence::types::{FieldValue, Query};

use crate::config::ServiceConfig;
use crate::context::{RequestArgs, RequestContext};
use crate::error::{ServiceError, ServiceResult};
use crate::monitor::MonitorHandler;
use crate::notification::{EventEnvelope, NotificationPublisher, Verb};

/// Business logic shared by every resource type.
pub struct ResourceService {
    store: Arc<dyn ResourceStore>,
    registry: Arc<SchemaRegistry>,
    publisher: NotificationPublisher,
    queries: QueryBuilder,
    monitor: MonitorHandler,
    fill_required_samples: bool,
    base_url: String,
}

impl std::fmt::Debug for ResourceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceService")
            .field("backend", &self.store.backend_name())
            .field("schemas", &self.registry.len())
            .field("queries", &self.queries)
            .field("fill_required_samples", &self.fill_required_samples)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ResourceService {
    /// Creates a service over a backend and schema registry.
    pub fn new(
        store: Arc<dyn ResourceStore>,
        registry: Arc<SchemaRegistry>,
        publisher: NotificationPublisher,
        config: &ServiceConfig,
    ) -> Self {
        Self {
            store,
            registry,
            publisher,
            queries: QueryBuilder::new(config.default_limit, config.max_limit),
            monitor: MonitorHandler::new(),
            fill_required_samples: config.fill_required_samples,
            base_url: config.base_url.clone(),
        }
    }

    /// The backend this service runs on.
    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    /// The schema registry.
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// A request context rooted at the configured base URL.
    ///
    /// Controllers add the request path and headers.
    pub fn context(
        &self,
        classname: ResourceType,
        operation_id: impl Into<String>,
        method: Method,
    ) -> RequestContext {
        RequestContext::new(classname, operation_id, method).with_base_url(self.base_url.clone())
    }

    fn schema(&self, resource_type: ResourceType) -> ServiceResult<&ResourceSchema> {
        Ok(self.registry.get(resource_type)?)
    }

    /// Parses a path id according to the type's id kind.
    ///
    /// A non-numeric id for a numeric type cannot name any resource.
    fn id_value(&self, schema: &ResourceSchema, id: &str) -> ServiceResult<FieldValue> {
        match schema.id_kind {
            IdKind::Uuid => Ok(FieldValue::from(id)),
            IdKind::Numeric => id
                .trim()
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| ServiceError::NotFound {
                    resource_type: schema.resource_type.to_string(),
                    id: id.to_string(),
                }),
        }
    }

    fn required_id<'a>(&self, args: &'a RequestArgs) -> ServiceResult<&'a str> {
        args.id()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ServiceError::bad_request("missing path parameter 'id'"))
    }

    /// A query addressing one resource, honoring a `fields` selection.
    fn single_query(&self, schema: &ResourceSchema, args: &RequestArgs) -> ServiceResult<Query> {
        let id = self.id_value(schema, self.required_id(args)?)?;
        let mut query = Query::by_id(id);
        if let Some(fields) = args.params.get("fields") {
            query = query.with_projection(
                fields
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty()),
            );
        }
        Ok(add_mandatory_projection_fields(query, schema))
    }

    fn notify(
        &self,
        verb: Verb,
        schema: &ResourceSchema,
        before: Option<&Value>,
        after: Option<&Value>,
    ) -> Option<EventEnvelope> {
        self.publisher.notify(verb, schema, before, after)
    }
}

/// Extracts a document's `href`, if it has one.
fn href_of(doc: &Value) -> Option<&str> {
    doc.get("href").and_then(Value::as_str)
}
