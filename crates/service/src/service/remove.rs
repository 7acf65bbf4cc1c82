//! Remove operation.

use tracing::debug;

use crate::context::{RequestArgs, RequestContext};
use crate::error::ServiceResult;
use crate::notification::Verb;
use crate::payload::strip_internal_fields;
use crate::response::ServiceResponse;

use tmf_persistence::types::Query;

use super::ResourceService;

impl ResourceService {
    /// Deletes a resource by `id`.
    ///
    /// The removal notification carries the deleted document.
    ///
    /// # Response
    ///
    /// - `204 No Content`
    /// - `404 Not Found` - no resource has that id
    pub async fn remove(
        &self,
        args: &RequestArgs,
        ctx: &RequestContext,
    ) -> ServiceResult<ServiceResponse> {
        let schema = self.schema(ctx.classname)?;
        let id = self.id_value(schema, self.required_id(args)?)?;

        debug!(resource_type = %ctx.classname, id = %id, "Processing remove request");

        let mut removed = self.store.remove(ctx.classname, &Query::by_id(id)).await?;
        strip_internal_fields(&mut removed);
        self.notify(Verb::Remove, schema, Some(&removed), None);

        Ok(ServiceResponse::no_content())
    }
}
