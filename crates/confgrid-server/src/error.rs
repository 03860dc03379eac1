//! Error types for the confgrid server
//!
//! - `ApiError`: request outcomes mapped to HTTP status codes and bodies
//! - `ConfigError`: configuration and logging setup failures
//! - `ServerError`: startup failures

use confgrid_core::{ConfigKey, RepositoryError, StoreError, ValidationError};
use serde_json::{json, Value};
use std::path::PathBuf;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Reply;

/// Operation a storage failure interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Reading a configuration matrix
    Fetch,
    /// Writing a remark
    Update,
}

impl Operation {
    /// Generic message sent to clients for storage failures
    #[inline]
    #[must_use]
    pub fn client_message(self) -> &'static str {
        match self {
            Self::Fetch => "Server error while fetching configuration",
            Self::Update => "Server error while updating configuration",
        }
    }
}

/// Request-level failure
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or blank id or remark
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Path id does not percent-decode to UTF-8
    #[error("Configuration id is not valid UTF-8")]
    InvalidIdEncoding,

    /// Request body is not valid JSON
    #[error("invalid JSON body: {0}")]
    MalformedBody(String),

    /// Key resolves to nothing
    #[error("Configuration with ID '{0}' not found")]
    NotFound(ConfigKey),

    /// Store failure; detail is logged, never sent
    #[error("storage failure during {operation:?}: {source}")]
    Storage {
        /// Interrupted operation
        operation: Operation,
        /// Underlying store error
        #[source]
        source: StoreError,
    },
}

impl ApiError {
    /// Map a repository error for the given operation
    #[must_use]
    pub fn from_repository(err: RepositoryError, operation: Operation) -> Self {
        match err {
            RepositoryError::Validation(e) => Self::Validation(e),
            RepositoryError::NotFound(key) => Self::NotFound(key),
            RepositoryError::Storage(source) => Self::Storage { operation, source },
        }
    }

    /// HTTP status for this error
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidIdEncoding | Self::MalformedBody(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body sent to the client
    #[must_use]
    pub fn body(&self) -> Value {
        match self {
            Self::Validation(_) | Self::InvalidIdEncoding | Self::MalformedBody(_) => {
                json!({ "message": self.to_string() })
            }
            Self::NotFound(_) => json!({
                "message": self.to_string(),
                "suggestion": "Please check if this configuration ID exists in the database",
            }),
            Self::Storage { operation, .. } => json!({ "message": operation.client_message() }),
        }
    }

    /// Log and convert into an HTTP response
    #[must_use]
    pub fn into_response(self) -> Response {
        match &self {
            Self::Storage { operation, source } => {
                tracing::error!(?operation, error = %source, "storage failure");
            }
            Self::NotFound(key) => tracing::warn!(key = %key, "configuration not found"),
            Self::Validation(_) | Self::InvalidIdEncoding | Self::MalformedBody(_) => {
                tracing::warn!(reason = %self, "request rejected");
            }
        }
        warp::reply::with_status(warp::reply::json(&self.body()), self.status()).into_response()
    }
}

/// Configuration loading and logging setup failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for `ServerConfig`
    #[error("invalid config file {path}: {source}")]
    Parse {
        /// Config file path
        path: PathBuf,
        /// Decode error
        #[source]
        source: toml::de::Error,
    },

    /// A value failed validation
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Subscriber could not be installed
    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Server startup failures
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Bad configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Listener could not be bound
    #[error("failed to bind listener: {0}")]
    Bind(#[from] warp::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(
            ApiError::Validation(ValidationError::BlankKey).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::InvalidIdEncoding.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::NotFound(ConfigKey::parse("k").unwrap()).status(),
            StatusCode::NOT_FOUND
        );
        let storage = ApiError::from_repository(
            RepositoryError::Storage(StoreError::io_error(
                "/secret/path",
                std::io::ErrorKind::PermissionDenied.into(),
            )),
            Operation::Update,
        );
        assert_eq!(storage.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn storage_body_hides_detail() {
        let err = ApiError::Storage {
            operation: Operation::Fetch,
            source: StoreError::io_error("/secret/path", std::io::ErrorKind::Other.into()),
        };
        let body = err.body().to_string();
        assert!(body.contains("Server error while fetching configuration"));
        assert!(!body.contains("/secret/path"));
    }

    #[test]
    fn not_found_body_names_key() {
        let err = ApiError::NotFound(ConfigKey::parse("doesnotexist123").unwrap());
        assert_eq!(
            err.body()["message"],
            "Configuration with ID 'doesnotexist123' not found"
        );
    }
}
