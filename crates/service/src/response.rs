//! Service response shape.

use http::header::{CONTENT_RANGE, LINK, LOCATION};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde_json::Value;
use tracing::warn;

/// Total number of matching resources.
pub const X_TOTAL_COUNT: HeaderName = HeaderName::from_static("x-total-count");

/// Number of resources in this page.
pub const X_RESULT_COUNT: HeaderName = HeaderName::from_static("x-result-count");

/// What a service call hands back to the controller.
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    /// Response body; `None` for 204.
    pub payload: Option<Value>,
    /// HTTP status.
    pub code: StatusCode,
    /// Headers to set on the response.
    pub header_params: HeaderMap,
}

impl ServiceResponse {
    /// Creates a response with a body.
    pub fn new(code: StatusCode, payload: Value) -> Self {
        Self {
            payload: Some(payload),
            code,
            header_params: HeaderMap::new(),
        }
    }

    /// Creates a 204 response.
    pub fn no_content() -> Self {
        Self {
            payload: None,
            code: StatusCode::NO_CONTENT,
            header_params: HeaderMap::new(),
        }
    }

    /// Adds a header, logging and skipping values that are not valid header text.
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.header_params.insert(name, value);
            }
            Err(_) => warn!(header = %name, value, "Skipping invalid header value"),
        }
        self
    }

    /// Adds a `Location` header.
    pub fn with_location(self, href: &str) -> Self {
        self.with_header(LOCATION, href)
    }

    /// Adds the `Link` header pointing at an async-operation monitor.
    pub fn with_monitor_link(self, href: &str) -> Self {
        self.with_header(LINK, &format!("<{}>; rel=related; title=monitor", href))
    }

    /// Adds the pagination headers for a page starting at `skip`.
    ///
    /// `Content-Range` is only added to partial (206) responses.
    pub fn with_pagination(self, returned: usize, total: u64, skip: u64) -> Self {
        let partial = self.code == StatusCode::PARTIAL_CONTENT;
        let response = self
            .with_header(X_TOTAL_COUNT, &total.to_string())
            .with_header(X_RESULT_COUNT, &returned.to_string());
        if !partial {
            return response;
        }
        let range = if returned == 0 {
            format!("items */{}", total)
        } else {
            format!("items {}-{}/{}", skip, skip + returned as u64 - 1, total)
        };
        response.with_header(CONTENT_RANGE, &range)
    }

    /// Returns a header value as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_params.get(name).and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pagination_headers_full_page() {
        let response = ServiceResponse::new(StatusCode::OK, json!([])).with_pagination(3, 3, 0);
        assert_eq!(response.header("x-total-count"), Some("3"));
        assert_eq!(response.header("x-result-count"), Some("3"));
        assert_eq!(response.header("content-range"), None);
    }

    #[test]
    fn test_pagination_headers_partial() {
        let response = ServiceResponse::new(StatusCode::PARTIAL_CONTENT, json!([]))
            .with_pagination(10, 42, 20);
        assert_eq!(response.header("content-range"), Some("items 20-29/42"));

        let response = ServiceResponse::new(StatusCode::PARTIAL_CONTENT, json!([]))
            .with_pagination(0, 42, 50);
        assert_eq!(response.header("content-range"), Some("items */42"));
    }

    #[test]
    fn test_monitor_link() {
        let response = ServiceResponse::new(StatusCode::ACCEPTED, json!({}))
            .with_monitor_link("http://x/monitor/1");
        assert_eq!(
            response.header("link"),
            Some("<http://x/monitor/1>; rel=related; title=monitor")
        );
    }

    #[test]
    fn test_no_content() {
        let response = ServiceResponse::no_content();
        assert_eq!(response.code, StatusCode::NO_CONTENT);
        assert!(response.payload.is_none());
    }
}
