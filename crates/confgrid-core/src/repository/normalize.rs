//! Legacy-schema normalization
//!
//! Stored documents carry their key and payload under whichever field name
//! the writer of the day used. Each lookup list below is evaluated in order,
//! first match wins.

use super::default_matrix;
use crate::store::{Document, ID_FIELD};
use crate::types::{ConfigKey, ConfigurationRecord, Matrix, MatrixSource};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Field new documents store their key under
pub const CANONICAL_KEY_FIELD: &str = "configId";

/// Field new documents store their matrix under
pub const CANONICAL_MATRIX_FIELD: &str = "data";

/// Recognized key fields, in lookup order
pub const KEY_FIELDS: [&str; 3] = [CANONICAL_KEY_FIELD, "configurationId", ID_FIELD];

/// Payload field and how to read it
#[derive(Debug, Clone, Copy)]
pub struct PayloadField {
    /// Stored field name
    pub name: &'static str,
    /// Source tag reported on the record
    pub source: MatrixSource,
    /// Reads the stored value, `None` when unusable
    pub extract: fn(&Value) -> Option<Matrix>,
}

/// Payload fields in priority order
pub const PAYLOAD_FIELDS: [PayloadField; 3] = [
    PayloadField {
        name: CANONICAL_MATRIX_FIELD,
        source: MatrixSource::Data,
        extract: Matrix::from_json,
    },
    PayloadField {
        name: "configuration",
        source: MatrixSource::Configuration,
        extract: Matrix::from_json,
    },
    PayloadField {
        name: "values",
        source: MatrixSource::Values,
        extract: Matrix::from_json,
    },
];

/// Resolve the payload of a stored document
///
/// Falls back to the default matrix when no field yields one.
#[must_use]
pub fn normalize_matrix(document: &Document) -> (Matrix, MatrixSource) {
    PAYLOAD_FIELDS
        .iter()
        .find_map(|field| {
            document
                .get(field.name)
                .and_then(field.extract)
                .map(|matrix| (matrix, field.source))
        })
        .unwrap_or_else(|| (default_matrix(), MatrixSource::Default))
}

/// Build the canonical record for a document found under `key`
#[must_use]
pub fn normalize_record(key: &ConfigKey, document: &Document) -> ConfigurationRecord {
    let (matrix, matrix_source) = normalize_matrix(document);
    ConfigurationRecord {
        key: key.clone(),
        document_id: document.get(ID_FIELD).and_then(Value::as_str).map(str::to_string),
        matrix,
        matrix_source,
        remark: document
            .get("remark")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        created_at: timestamp(document, "createdAt"),
        updated_at: timestamp(document, "updatedAt"),
    }
}

fn timestamp(document: &Document, field: &str) -> Option<DateTime<Utc>> {
    let raw = document.get(field)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
