//! Show operation.

use http::StatusCode;
use tracing::debug;

use crate::context::{RequestArgs, RequestContext};
use crate::error::ServiceResult;
use crate::notification::Verb;
use crate::payload::strip_internal_fields;
use crate::response::ServiceResponse;

use super::{ResourceService, href_of};

impl ResourceService {
    /// Retrieves one resource by `id`.
    ///
    /// A `fields` argument narrows the result; identity fields are always
    /// included.
    ///
    /// # Response
    ///
    /// - `200 OK` - with `Location` when the resource has an `href`
    /// - `404 Not Found` - no resource has that id
    pub async fn show(
        &self,
        args: &RequestArgs,
        ctx: &RequestContext,
    ) -> ServiceResult<ServiceResponse> {
        let schema = self.schema(ctx.classname)?;
        let query = self.single_query(schema, args)?;

        debug!(resource_type = %ctx.classname, id = ?args.id(), "Processing show request");

        let mut doc = self.store.find_one(ctx.classname, &query).await?;
        strip_internal_fields(&mut doc);
        self.notify(Verb::Show, schema, None, Some(&doc));

        let location = href_of(&doc).map(str::to_string);
        let response = ServiceResponse::new(StatusCode::OK, doc);
        Ok(match location {
            Some(href) => response.with_location(&href),
            None => response,
        })
    }
}
