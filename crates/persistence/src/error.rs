//! Error types for the persistence layer.
//!
//! Every backend maps its engine-specific failures onto this hierarchy before
//! returning, so callers only ever see [`StorageError`]. [`StorageError::kind`]
//! collapses the hierarchy further into the small, fixed [`ErrorKind`] set
//! that the service layer turns into HTTP status codes.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

/// The primary error type for all storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Resource state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Query and payload validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors related to resource state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The requested resource was not found.
    #[error("resource not found: {resource_type}/{id}")]
    NotFound { resource_type: String, id: String },

    /// A resource with the given ID already exists.
    #[error("resource already exists: {resource_type}/{id}")]
    AlreadyExists { resource_type: String, id: String },
}

/// Errors related to queries, payloads and schema lookups.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A query parameter could not be interpreted.
    #[error("invalid query parameter '{parameter}': {message}")]
    InvalidQuery { parameter: String, message: String },

    /// A post-filter or subscription filter expression failed to parse.
    #[error("invalid filter expression: {message}")]
    InvalidFilter { message: String },

    /// The request body is not an acceptable resource document.
    #[error("invalid resource: {message}")]
    InvalidResource { message: String },

    /// The resource type is not registered.
    #[error("unsupported resource type: {resource_type}")]
    UnsupportedResourceType { resource_type: String },

    /// Missing required field.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// The engine gave up waiting (lock, busy handler, driver deadline).
    #[error("operation timed out in {backend_name}")]
    Timeout { backend_name: String },

    /// The engine refused the credentials or the operation.
    #[error("access denied by {backend_name}: {message}")]
    AccessDenied {
        backend_name: String,
        message: String,
    },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The engine rejected the translated query.
    #[error("query execution failed: {message}")]
    QueryError { message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// The normalized error categories a backend may surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The addressed document does not exist.
    NotFound,
    /// The query could not be interpreted or executed.
    InvalidQuery,
    /// The payload is not an acceptable document.
    InvalidBody,
    /// The document collides with an existing one.
    Conflict,
    /// The engine refused the operation.
    AccessDenied,
    /// Anything else.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not-found",
            ErrorKind::InvalidQuery => "invalid-query",
            ErrorKind::InvalidBody => "invalid-body",
            ErrorKind::Conflict => "conflict",
            ErrorKind::AccessDenied => "access-denied",
            ErrorKind::Internal => "internal",
        };
        write!(f, "{}", name)
    }
}

impl StorageError {
    /// Returns the normalized category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Resource(ResourceError::NotFound { .. }) => ErrorKind::NotFound,
            StorageError::Resource(ResourceError::AlreadyExists { .. }) => ErrorKind::Conflict,
            StorageError::Validation(e) => match e {
                ValidationError::InvalidQuery { .. }
                | ValidationError::InvalidFilter { .. }
                | ValidationError::UnsupportedResourceType { .. } => ErrorKind::InvalidQuery,
                ValidationError::InvalidResource { .. }
                | ValidationError::MissingRequiredField { .. } => ErrorKind::InvalidBody,
            },
            StorageError::Backend(BackendError::QueryError { .. }) => ErrorKind::InvalidQuery,
            StorageError::Backend(BackendError::AccessDenied { .. }) => ErrorKind::AccessDenied,
            StorageError::Backend(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for a not-found error.
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        StorageError::Resource(ResourceError::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        })
    }

    /// Returns true if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if matches!(
                    failure.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                StorageError::Backend(BackendError::Timeout {
                    backend_name: "sqlite".to_string(),
                })
            }
            rusqlite::Error::SqliteFailure(failure, _)
                if matches!(
                    failure.code,
                    rusqlite::ErrorCode::PermissionDenied
                        | rusqlite::ErrorCode::ReadOnly
                        | rusqlite::ErrorCode::AuthorizationForStatementDenied
                ) =>
            {
                StorageError::Backend(BackendError::AccessDenied {
                    backend_name: "sqlite".to_string(),
                    message: err.to_string(),
                })
            }
            _ => StorageError::Backend(BackendError::Internal {
                backend_name: "sqlite".to_string(),
                message: err.to_string(),
                source: Some(Box::new(err)),
            }),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(_err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        })
    }
}
