//! Error types for confgrid core
//!
//! Three layers, matching where a failure can originate:
//! - Input validation (blank keys, blank or missing remarks)
//! - Document store failures (I/O, corrupt snapshots, unique-index violations)
//! - Repository outcomes (not found, wrapped store failures)

use crate::types::ConfigKey;
use std::path::PathBuf;

/// Input rejected before any store access
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Key missing or whitespace only
    #[error("Configuration id is required")]
    BlankKey,

    /// Remark field absent from the request
    #[error("Remark is required and must be a string")]
    MissingRemark,

    /// Remark present but not a JSON string
    #[error("Remark is required and must be a string")]
    RemarkNotString,

    /// Remark whitespace only
    #[error("Remark must not be empty")]
    BlankRemark,
}

/// Document store failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique field already holds this value in another document
    #[error("duplicate value for unique field '{field}': {value}")]
    DuplicateKey {
        /// Indexed field
        field: String,
        /// Clashing value
        value: String,
    },

    /// IO error on the backing file
    #[error("io error on {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Backing file exists but does not hold a valid collection
    #[error("corrupt collection file {path}: {source}")]
    Corrupt {
        /// Collection file
        path: PathBuf,
        /// Decode error
        #[source]
        source: serde_json::Error,
    },

    /// Snapshot could not be encoded
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Repository outcomes that are not a resolved record
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Invalid input
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// No document matches the key under any recognized key field
    #[error("configuration '{0}' not found")]
    NotFound(ConfigKey),

    /// Store read or write failed
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl RepositoryError {
    /// Check if this is a not-found outcome
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
