//! List operation.

use http::StatusCode;
use serde_json::Value;
use tracing::debug;

use tmf_persistence::query::{add_mandatory_projection_fields, project};

use crate::context::{RequestArgs, RequestContext};
use crate::error::ServiceResult;
use crate::notification::Verb;
use crate::payload::strip_internal_fields;
use crate::response::ServiceResponse;

use super::ResourceService;

impl ResourceService {
    /// Lists resources.
    ///
    /// # Arguments
    ///
    /// - `fields` - comma-separated projection
    /// - `offset`, `limit` - paging; `limit` is clamped to the configured ceiling
    /// - `sort` - `field,-field2`
    /// - `filter` - post-filter expression applied to the returned page,
    ///   evaluated on whole rows before `fields` is applied
    /// - any other key - a criterion, optionally with an operator suffix
    ///   (`version.gte=2`)
    ///
    /// # Response
    ///
    /// - `200 OK` - the whole result set fits in the page
    /// - `206 Partial Content` - more results exist and the type declares
    ///   partial content
    /// - `400 Bad Request` - a query value could not be interpreted
    ///
    /// `X-Total-Count` counts the rows matching the criteria; the post-filter
    /// only narrows the page, which `X-Result-Count` reflects.
    pub async fn index(
        &self,
        args: &RequestArgs,
        ctx: &RequestContext,
    ) -> ServiceResult<ServiceResponse> {
        let schema = self.schema(ctx.classname)?;
        let query = self.queries.build(&args.params, schema)?;
        let query = add_mandatory_projection_fields(query, schema);

        debug!(
            resource_type = %ctx.classname,
            criteria = query.criteria.len(),
            skip = query.options.skip,
            limit = ?query.options.limit,
            "Processing list request"
        );

        // The post-filter sees whole rows; projection happens afterwards.
        let page = match &query.post_filter {
            Some(_) if !query.options.projection.is_empty() => {
                let mut unprojected = query.clone();
                unprojected.options.projection.clear();
                self.store.find_many(ctx.classname, &unprojected).await?
            }
            _ => self.store.find_many(ctx.classname, &query).await?,
        };
        let fetched = page.len() as u64;
        let total = page.total;

        let mut rows = page.rows;
        for row in &mut rows {
            strip_internal_fields(row);
        }
        if let Some(filter) = &query.post_filter {
            rows.retain(|row| filter.matches(row));
            if !query.options.projection.is_empty() {
                rows = rows
                    .iter()
                    .map(|row| project(row, &query.options.projection))
                    .collect();
            }
        }

        let code = if schema.partial_content && fetched < total {
            StatusCode::PARTIAL_CONTENT
        } else {
            StatusCode::OK
        };

        let returned = rows.len();
        let payload = Value::Array(rows);
        self.notify(Verb::List, schema, None, Some(&payload));

        debug!(
            resource_type = %ctx.classname,
            returned,
            total,
            status = code.as_u16(),
            "List complete"
        );

        Ok(ServiceResponse::new(code, payload).with_pagination(returned, total, query.options.skip))
    }
}
