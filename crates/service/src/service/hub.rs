//! Hub (webhook subscription) registration.

use http::StatusCode;
use serde_json::{Map, Value};
use tracing::{info, warn};
use url::Url;

use tmf_persistence::query::parse_subscription_filter;
use tmf_persistence::schema::ResourceType;
use tmf_persistence::types::{FieldValue, Query};

use crate::context::{RequestArgs, RequestContext};
use crate::error::{ServiceError, ServiceResult};
use crate::payload::as_object;
use crate::response::ServiceResponse;

use super::ResourceService;

impl ResourceService {
    /// Registers a webhook subscription.
    ///
    /// The body carries `callback`, an absolute http(s) URL, and an optional
    /// `query` filter such as `eventType=ServiceCreationNotification`. A
    /// filter that does not parse is stored as given; such a hub matches no
    /// events.
    ///
    /// # Response
    ///
    /// - `201 Created` - with `Location` of the hub
    /// - `400 Bad Request` - missing or invalid callback
    pub async fn register_hub(
        &self,
        args: &RequestArgs,
        ctx: &RequestContext,
    ) -> ServiceResult<ServiceResponse> {
        let schema = self.schema(ResourceType::Hub)?;
        let body = args
            .body
            .clone()
            .ok_or_else(|| ServiceError::bad_request("missing request body"))?;
        let body = as_object(body)?;

        let callback = body
            .get("callback")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::bad_request("missing required field: callback"))?;
        match Url::parse(callback) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            _ => {
                return Err(ServiceError::bad_request(format!(
                    "callback '{}' is not an absolute http(s) URL",
                    callback
                )));
            }
        }

        let query = match body.get("query") {
            None | Some(Value::Null) => None,
            Some(Value::String(q)) => Some(q.clone()),
            Some(_) => return Err(ServiceError::bad_request("query must be a string")),
        };
        if let Some(q) = &query {
            let event_schema = self.schema(ResourceType::Event)?;
            if let Err(e) = parse_subscription_filter(q, event_schema) {
                warn!(callback = %callback, filter = %q, error = %e, "Registering hub whose filter matches nothing");
            }
        }

        let id = schema.id_kind.generate();
        let mut hub = Map::new();
        hub.insert("id".to_string(), id.clone());
        hub.insert("callback".to_string(), Value::String(callback.to_string()));
        if let Some(q) = query {
            hub.insert("query".to_string(), Value::String(q));
        }

        let stored = self
            .store
            .create(ResourceType::Hub, Value::Object(hub))
            .await?;

        let id_text = match &id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let location = format!("{}/{}", ctx.collection_url(), id_text);
        info!(hub_id = %id_text, callback = %callback, "Hub registered");

        Ok(ServiceResponse::new(StatusCode::CREATED, stored).with_location(&location))
    }

    /// Removes a webhook subscription.
    ///
    /// # Response
    ///
    /// - `204 No Content`
    /// - `404 Not Found` - no hub has that id
    pub async fn unregister_hub(
        &self,
        args: &RequestArgs,
        _ctx: &RequestContext,
    ) -> ServiceResult<ServiceResponse> {
        let id = self.required_id(args)?;
        self.store
            .remove(ResourceType::Hub, &Query::by_id(FieldValue::from(id)))
            .await?;
        info!(hub_id = %id, "Hub unregistered");
        Ok(ServiceResponse::no_content())
    }
}
