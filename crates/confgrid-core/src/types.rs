//! Core types for confgrid
//!
//! Defines the validated inputs and the canonical record:
//! - `ConfigKey` / `Remark` newtypes (trimmed, never blank)
//! - `Matrix`, the 2-D token payload
//! - `ConfigurationRecord`, the normalized view of a stored document

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// External configuration identifier
///
/// Always trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ConfigKey(String);

impl ConfigKey {
    /// Parse a raw identifier
    ///
    /// # Errors
    /// `ValidationError::BlankKey` if the input is empty after trimming
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::BlankKey);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get key as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConfigKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Free-text annotation, trimmed and non-empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Remark(String);

impl Remark {
    /// Parse a raw remark
    ///
    /// # Errors
    /// `ValidationError::BlankRemark` if the input is empty after trimming
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::BlankRemark);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Extract the remark from a request body value
    ///
    /// # Errors
    /// - `MissingRemark` when the field is absent or null
    /// - `RemarkNotString` when it holds a non-string value
    /// - `BlankRemark` when it is whitespace only
    pub fn from_body(body: &Value) -> Result<Self, ValidationError> {
        match body.get("remark") {
            None | Some(Value::Null) => Err(ValidationError::MissingRemark),
            Some(Value::String(s)) => Self::parse(s),
            Some(_) => Err(ValidationError::RemarkNotString),
        }
    }

    /// Get remark as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Remark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 2-D array of string tokens
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Matrix(Vec<Vec<String>>);

impl Matrix {
    /// Create from rows
    #[inline]
    #[must_use]
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self(rows)
    }

    /// Build from string-slice rows
    #[must_use]
    pub fn from_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    /// Read a stored value as a matrix
    ///
    /// Returns `None` unless the value is an array whose every row is an
    /// array of strings.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        let rows = value.as_array()?;
        rows.iter()
            .map(|row| {
                row.as_array()?
                    .iter()
                    .map(|cell| cell.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
            })
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }

    /// Encode as a JSON array of arrays
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.0
                .iter()
                .map(|row| Value::Array(row.iter().cloned().map(Value::String).collect()))
                .collect(),
        )
    }

    /// Rows of the matrix
    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.0
    }

    /// Number of rows
    #[inline]
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.0.len()
    }
}

/// Which stored field the matrix was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatrixSource {
    /// `data` field
    Data,
    /// `configuration` field
    Configuration,
    /// `values` field
    Values,
    /// No usable field, placeholder substituted
    Default,
}

impl MatrixSource {
    /// Stored field name, if any
    #[inline]
    #[must_use]
    pub fn field_name(self) -> Option<&'static str> {
        match self {
            Self::Data => Some("data"),
            Self::Configuration => Some("configuration"),
            Self::Values => Some("values"),
            Self::Default => None,
        }
    }
}

/// Canonical view of a stored configuration document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationRecord {
    /// External identifier
    pub key: ConfigKey,
    /// Store-native identifier, when present
    pub document_id: Option<String>,
    /// Normalized payload
    pub matrix: Matrix,
    /// Field the payload came from
    pub matrix_source: MatrixSource,
    /// Annotation, empty when unset
    pub remark: String,
    /// Creation time, absent on legacy documents
    pub created_at: Option<DateTime<Utc>>,
    /// Last mutation time, absent on legacy documents
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConfigurationRecord {
    /// Whether the record was mutated after creation
    #[must_use]
    pub fn updated_since_creation(&self) -> bool {
        match (self.created_at, self.updated_at) {
            (Some(created), Some(updated)) => updated > created,
            _ => false,
        }
    }
}
