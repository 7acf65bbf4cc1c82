//! Update (PUT) and patch (PATCH) operations.

use chrono::Utc;
use http::StatusCode;
use serde_json::Value;
use tracing::debug;

use tmf_persistence::types::Query;

use crate::context::{RequestArgs, RequestContext};
use crate::error::{ServiceError, ServiceResult};
use crate::notification::Verb;
use crate::payload::{check_required, prepare_modification, strip_internal_fields};
use crate::response::ServiceResponse;

use super::{ResourceService, href_of};

/// Attributes a replacement keeps from the stored document when the body
/// does not carry them.
const PRESERVED_ON_REPLACE: &[&str] = &["href", "creationDate", "@type", "@baseType"];

impl ResourceService {
    /// Replaces a resource.
    ///
    /// `id`, `href` and `creationDate` cannot be changed; `@type` and
    /// `@baseType` are kept when the body omits them.
    ///
    /// # Response
    ///
    /// - `200 OK` - with `Location` when the resource has an `href`
    /// - `400 Bad Request` - body is not an object or lacks a required field
    /// - `404 Not Found` - no resource has that id; nothing is created
    pub async fn update(
        &self,
        args: &RequestArgs,
        ctx: &RequestContext,
    ) -> ServiceResult<ServiceResponse> {
        self.modify(Verb::Update, args, ctx).await
    }

    /// Merges the body into a resource (RFC 7386 merge patch).
    ///
    /// A `null` member removes the property. `id`, `href` and
    /// `creationDate` in the body are ignored.
    ///
    /// # Response
    ///
    /// - `200 OK` - with `Location` when the resource has an `href`
    /// - `404 Not Found` - no resource has that id; nothing is created
    pub async fn patch(
        &self,
        args: &RequestArgs,
        ctx: &RequestContext,
    ) -> ServiceResult<ServiceResponse> {
        self.modify(Verb::Patch, args, ctx).await
    }

    async fn modify(
        &self,
        verb: Verb,
        args: &RequestArgs,
        ctx: &RequestContext,
    ) -> ServiceResult<ServiceResponse> {
        let schema = self.schema(ctx.classname)?;
        let id = self.id_value(schema, self.required_id(args)?)?;
        let target = Query::by_id(id);
        let payload = args
            .body
            .clone()
            .ok_or_else(|| ServiceError::bad_request("missing request body"))?;

        debug!(resource_type = %ctx.classname, id = ?args.id(), verb = ?verb, "Processing modify request");

        let mut doc = prepare_modification(payload, schema, Utc::now())?;
        let before = self.store.find_one(ctx.classname, &target).await?;

        let mut after = if verb == Verb::Update {
            for field in PRESERVED_ON_REPLACE {
                if let Some(value) = before.get(*field) {
                    doc.entry(*field).or_insert_with(|| value.clone());
                }
            }
            check_required(&doc, schema)?;
            self.store
                .update(ctx.classname, &target, Value::Object(doc))
                .await?
        } else {
            self.store
                .patch(ctx.classname, &target, Value::Object(doc))
                .await?
        };

        let mut before = before;
        strip_internal_fields(&mut before);
        strip_internal_fields(&mut after);
        self.notify(verb, schema, Some(&before), Some(&after));

        let mut result = self
            .store
            .find_one(ctx.classname, &self.single_query(schema, args)?)
            .await?;
        strip_internal_fields(&mut result);

        let location = href_of(&result).map(str::to_string);
        let response = ServiceResponse::new(StatusCode::OK, result);
        Ok(match location {
            Some(href) if schema.has_href() => response.with_location(&href),
            _ => response,
        })
    }
}
