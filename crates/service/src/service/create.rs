//! Create operation.

use chrono::Utc;
use http::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::{RequestArgs, RequestContext};
use crate::error::{ServiceError, ServiceResult};
use crate::notification::Verb;
use crate::payload::{
    apply_defaults, as_object, check_required, coerce_payload, fill_required_samples,
    stamp_common, strip_create_excluded, strip_internal_fields,
};
use crate::response::ServiceResponse;

use super::{ResourceService, href_of};

impl ResourceService {
    /// Prepares and stores a new document without notifying.
    async fn insert_document(&self, ctx: &RequestContext, payload: Value) -> ServiceResult<Value> {
        let schema = self.schema(ctx.classname)?;
        let now = Utc::now();

        let mut doc = as_object(payload)?;
        coerce_payload(&mut doc, schema);
        stamp_common(&mut doc, schema, ctx, now);
        apply_defaults(&mut doc, schema, now);
        if self.fill_required_samples {
            fill_required_samples(&mut doc, schema, now);
        }
        strip_create_excluded(&mut doc, schema);
        check_required(&doc, schema)?;

        let mut stored = self
            .store
            .create(ctx.classname, Value::Object(doc))
            .await?;
        strip_internal_fields(&mut stored);
        Ok(stored)
    }

    /// The ordinary create path: store the document and publish its
    /// creation notification. Returns the stored document.
    pub async fn create_document(&self, ctx: RequestContext, payload: Value) -> ServiceResult<Value> {
        let schema = self.schema(ctx.classname)?;
        let doc = self.insert_document(&ctx, payload).await?;
        self.notify(Verb::Create, schema, None, Some(&doc));
        Ok(doc)
    }

    /// Creates a resource from the request body.
    ///
    /// The server assigns `id`, derives `href`, stamps `creationDate` and
    /// `lastUpdate` and applies the type's defaults. Properties the type
    /// excludes from create are dropped.
    ///
    /// # Headers
    ///
    /// - `Prefer: respond-async` - for types with an async contract, record
    ///   the request in a Monitor and answer 202
    /// - `Prefer: return=minimal` - omit the body from a 201
    ///
    /// # Response
    ///
    /// - `201 Created` - with `Location` when the resource has an `href`
    /// - `202 Accepted` - with `Link: <monitor>; rel=related; title=monitor`
    /// - `400 Bad Request` - body is not an object or lacks a required field
    /// - `409 Conflict` - the generated id collided
    pub async fn create(
        &self,
        args: &RequestArgs,
        ctx: &RequestContext,
    ) -> ServiceResult<ServiceResponse> {
        let schema = self.schema(ctx.classname)?;
        let payload = args
            .body
            .clone()
            .ok_or_else(|| ServiceError::bad_request("missing request body"))?;
        let prefer = ctx.prefer();

        debug!(
            resource_type = %ctx.classname,
            respond_async = prefer.prefer_async(),
            "Processing create request"
        );

        let doc = self.insert_document(ctx, payload.clone()).await?;

        if schema.async_create.is_some() && prefer.prefer_async() {
            let monitor = self
                .monitor
                .create_async(ctx, schema, &doc, &payload, |monitor_ctx, monitor_doc| {
                    self.create_document(monitor_ctx, monitor_doc)
                })
                .await;

            match monitor {
                Ok(Some(monitor)) => {
                    debug!(
                        resource_type = %ctx.classname,
                        monitor = %monitor.href,
                        "Create accepted for async processing"
                    );
                    return Ok(ServiceResponse::new(StatusCode::ACCEPTED, doc)
                        .with_monitor_link(&monitor.href));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        resource_type = %ctx.classname,
                        error = %e,
                        "Monitor creation failed, answering synchronously"
                    );
                }
            }
        }

        self.notify(Verb::Create, schema, None, Some(&doc));

        let location = href_of(&doc).map(str::to_string);
        let mut response = ServiceResponse::new(StatusCode::CREATED, doc);
        if prefer.is_minimal() {
            response.payload = None;
        }
        Ok(match location {
            Some(href) => response.with_location(&href),
            None => response,
        })
    }
}
