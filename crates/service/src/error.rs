//! Error types for the resource service.
//!
//! Storage errors are collapsed through [`StorageError::kind`] and surfaced as
//! a status code plus message; the controller writes them out as TMF error
//! bodies via [`ServiceError::to_body`].
//!
//! # Error Mapping
//!
//! | Storage kind | HTTP Status |
//! |--------------|-------------|
//! | NotFound | 404 |
//! | InvalidQuery / InvalidBody | 400 |
//! | AccessDenied | 403 |
//! | Conflict | 409 |
//! | Internal | 500 |

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use http::StatusCode;
use serde_json::{Value, json};
use thiserror::Error;

use tmf_persistence::error::{ErrorKind, ResourceError, StorageError, ValidationError};

/// The error type returned by every service operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// The addressed resource does not exist (HTTP 404).
    #[error("Resource not found: {resource_type}/{id}")]
    NotFound { resource_type: String, id: String },

    /// The query or body could not be accepted (HTTP 400).
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// The backend refused the operation (HTTP 403).
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// The resource collides with an existing one (HTTP 409).
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Anything else (HTTP 500).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ServiceError {
    /// Returns the HTTP status for this error.
    pub fn code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ServiceError::Conflict { .. } => StatusCode::CONFLICT,
            ServiceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Shorthand for a bad request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        ServiceError::BadRequest {
            message: message.into(),
        }
    }

    /// Shorthand for an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::Internal {
            message: message.into(),
        }
    }

    /// Renders the TMF error body for this error.
    pub fn to_body(&self) -> Value {
        let code = self.code();
        json!({
            "@type": "Error",
            "code": code.as_u16().to_string(),
            "status": code.as_u16().to_string(),
            "reason": code.canonical_reason().unwrap_or("Error"),
            "message": self.to_string(),
        })
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Resource(ResourceError::NotFound { resource_type, id }) => {
                ServiceError::NotFound { resource_type, id }
            }
            other => {
                let message = other.to_string();
                match other.kind() {
                    ErrorKind::InvalidQuery | ErrorKind::InvalidBody => {
                        ServiceError::BadRequest { message }
                    }
                    ErrorKind::AccessDenied => ServiceError::Forbidden { message },
                    ErrorKind::Conflict => ServiceError::Conflict { message },
                    ErrorKind::NotFound | ErrorKind::Internal => ServiceError::Internal { message },
                }
            }
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::from(StorageError::from(err))
    }
}

/// Result type alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tmf_persistence::error::BackendError;

    #[test]
    fn test_not_found_display() {
        let err = ServiceError::NotFound {
            resource_type: "Service".to_string(),
            id: "123".to_string(),
        };
        assert_eq!(err.to_string(), "Resource not found: Service/123");
        assert_eq!(err.code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_storage_error_mapping() {
        let err: ServiceError = StorageError::not_found("Service", "1").into();
        assert_eq!(
            err,
            ServiceError::NotFound {
                resource_type: "Service".to_string(),
                id: "1".to_string()
            }
        );

        let err: ServiceError = StorageError::from(ValidationError::InvalidQuery {
            parameter: "limit".to_string(),
            message: "bad".to_string(),
        })
        .into();
        assert_eq!(err.code(), StatusCode::BAD_REQUEST);

        let err: ServiceError = StorageError::from(ResourceError::AlreadyExists {
            resource_type: "Hub".to_string(),
            id: "h".to_string(),
        })
        .into();
        assert_eq!(err.code(), StatusCode::CONFLICT);

        let err: ServiceError = StorageError::from(BackendError::Timeout {
            backend_name: "sqlite".to_string(),
        })
        .into();
        assert_eq!(err.code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err: ServiceError = StorageError::from(BackendError::AccessDenied {
            backend_name: "sqlite".to_string(),
            message: "readonly".to_string(),
        })
        .into();
        assert_eq!(err.code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_error_body() {
        let body = ServiceError::bad_request("limit is not a number").to_body();
        assert_eq!(body["code"], "400");
        assert_eq!(body["reason"], "Bad Request");
        assert_eq!(body["@type"], "Error");
        assert!(body["message"].as_str().unwrap().contains("limit"));
    }
}
