//! Per-call request context and arguments.
//!
//! The controller layer extracts path, query and body parameters into
//! [`RequestArgs`] and describes the call in a [`RequestContext`]; the
//! service never sees the HTTP request itself.

use std::collections::BTreeMap;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::Value;

use tmf_persistence::schema::ResourceType;

/// The inbound request as seen by the service.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    /// Public base URL, e.g. `https://broker.example.com/tmf-api`.
    pub base_url: String,
    /// Request path below the base URL, e.g. `/serviceInventory/v4/service`.
    pub path: String,
    /// Request headers.
    pub headers: HeaderMap,
}

/// Describes one service call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The resource type the call addresses.
    pub classname: ResourceType,
    /// Operation identifier from the API definition (e.g. `createService`).
    pub operation_id: String,
    /// HTTP method of the inbound request.
    pub method: Method,
    /// The inbound request.
    pub request: RequestInfo,
}

impl RequestContext {
    /// Creates a context with an empty request.
    pub fn new(classname: ResourceType, operation_id: impl Into<String>, method: Method) -> Self {
        Self {
            classname,
            operation_id: operation_id.into(),
            method,
            request: RequestInfo::default(),
        }
    }

    /// Sets the public base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.request.base_url = base_url.into();
        self
    }

    /// Sets the request path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.request.path = path.into();
        self
    }

    /// Adds a request header. Invalid header values are ignored.
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.request.headers.insert(name, value);
        }
        self
    }

    /// Returns the parsed `Prefer` header.
    pub fn prefer(&self) -> PreferHeader {
        PreferHeader::from_headers(&self.request.headers)
    }

    /// URL of the collection this call addresses.
    ///
    /// Without a request path the collection is placed directly under the
    /// base URL.
    pub fn collection_url(&self) -> String {
        let base = self.request.base_url.trim_end_matches('/');
        let path = self.request.path.trim_end_matches('/');
        if path.is_empty() {
            format!("{}/{}", base, self.classname.event_key())
        } else {
            format!("{}{}", base, path)
        }
    }

    /// A context for a call on a sibling collection under the same API
    /// prefix, such as the monitor of an async create. Headers are not
    /// carried over.
    ///
    /// `/serviceOrdering/v4/serviceOrder` with `Monitor` addresses
    /// `/serviceOrdering/v4/monitor`.
    pub fn sibling(&self, resource_type: ResourceType, operation_id: impl Into<String>) -> Self {
        let path = self.request.path.trim_end_matches('/');
        let sibling_path = match path.rsplit_once('/') {
            Some((parent, _)) => format!("{}/{}", parent, resource_type.event_key()),
            None => String::new(),
        };
        Self::new(resource_type, operation_id, Method::POST)
            .with_base_url(self.request.base_url.clone())
            .with_path(sibling_path)
    }
}

/// Flat request arguments extracted by the controller.
#[derive(Debug, Clone, Default)]
pub struct RequestArgs {
    /// Path and query parameters.
    pub params: BTreeMap<String, String>,
    /// Request body, if any.
    pub body: Option<Value>,
}

impl RequestArgs {
    /// Creates empty arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Arguments addressing one resource by id.
    pub fn for_id(id: impl Into<String>) -> Self {
        Self::new().with_param("id", id)
    }

    /// Returns the `id` parameter.
    pub fn id(&self) -> Option<&str> {
        self.params.get("id").map(String::as_str)
    }
}

/// Parsed `Prefer` header values.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PreferHeader {
    return_preference: Option<String>,
    respond_async: bool,
}

impl PreferHeader {
    /// Parses the `Prefer` header from a header map.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut result = Self::default();

        for value in headers.get_all("prefer") {
            let Ok(prefer) = value.to_str() else {
                continue;
            };
            for directive in prefer.split([',', ';']) {
                let directive = directive.trim();
                if let Some(value) = directive.strip_prefix("return=") {
                    result.return_preference = Some(value.trim_matches('"').to_string());
                } else if directive.eq_ignore_ascii_case("respond-async") {
                    result.respond_async = true;
                }
            }
        }

        result
    }

    /// Returns the return preference (`minimal`, `representation`).
    pub fn return_preference(&self) -> Option<&str> {
        self.return_preference.as_deref()
    }

    /// Returns whether an asynchronous response is preferred.
    pub fn prefer_async(&self) -> bool {
        self.respond_async
    }

    /// Checks if minimal return is requested.
    pub fn is_minimal(&self) -> bool {
        self.return_preference.as_deref() == Some("minimal")
    }
}
