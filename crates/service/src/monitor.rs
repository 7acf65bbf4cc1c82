//! Asynchronous create support.
//!
//! When a resource type declares an async contract and the caller prefers
//! `respond-async`, the service records the request in a Monitor resource
//! and answers 202 with a link to it. Running the deferred work and moving
//! the monitor to a final state happen elsewhere.

use std::future::Future;

use serde_json::{Value, json};
use tracing::debug;

use tmf_persistence::schema::ResourceSchema;

use crate::context::RequestContext;
use crate::error::{ServiceError, ServiceResult};

/// Identifies a created monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorRef {
    /// Monitor id.
    pub id: String,
    /// Monitor href, used for the `Link` header.
    pub href: String,
}

impl MonitorRef {
    fn from_document(doc: &Value, ctx: &RequestContext) -> ServiceResult<Self> {
        let id = match doc.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(ServiceError::internal("created monitor has no id")),
        };
        let href = doc
            .get("href")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/{}", ctx.collection_url(), id));
        Ok(Self { id, href })
    }
}

/// Creates monitors for asynchronous creates.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorHandler;

impl MonitorHandler {
    /// Creates a handler.
    pub fn new() -> Self {
        Self
    }

    /// Records an in-flight create as a monitor.
    ///
    /// `created` is the document the original create stored and `payload`
    /// the body the caller sent. The monitor is stored through `create_fn`,
    /// the ordinary create path. Returns `None` when `schema` declares no
    /// async contract, in which case nothing is created.
    pub async fn create_async<F, Fut>(
        &self,
        ctx: &RequestContext,
        schema: &ResourceSchema,
        created: &Value,
        payload: &Value,
        create_fn: F,
    ) -> ServiceResult<Option<MonitorRef>>
    where
        F: FnOnce(RequestContext, Value) -> Fut,
        Fut: Future<Output = ServiceResult<Value>>,
    {
        let Some(contract) = schema.async_create else {
            return Ok(None);
        };

        let target = ctx.collection_url();
        let source_href = created
            .get("href")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| created.get("id").map(|id| format!("{}/{}", target, plain(id))))
            .unwrap_or_else(|| target.clone());

        let monitor = json!({
            "@type": contract.monitor.as_str(),
            "sourceHref": source_href,
            "state": "InProgress",
            "request": {
                "method": ctx.method.as_str(),
                "body": payload,
                "to": target,
            },
        });

        let monitor_ctx = ctx.sibling(contract.monitor, format!("create{}", contract.monitor));
        let stored = create_fn(monitor_ctx.clone(), monitor).await?;
        let monitor_ref = MonitorRef::from_document(&stored, &monitor_ctx)?;

        debug!(
            resource_type = %schema.resource_type,
            monitor_id = %monitor_ref.id,
            source = %source_href,
            "Monitor created for async request"
        );
        Ok(Some(monitor_ref))
    }
}

fn plain(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
