//! Document store abstraction
//!
//! A single collection of loosely-typed JSON documents with the handful of
//! atomic primitives the repository needs:
//!
//! ```text
//! find_one              filter -> first match
//! find_one_and_update   filter + update [+ insert doc] -> post-image   (atomic)
//! replace_one           filter + doc [+ upsert] -> outcome              (atomic)
//! insert_many / find_all / drop_collection
//! ```
//!
//! Every document carries a store-native `_id`; one is generated on insert
//! when the caller does not supply it.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::DateTime;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt::Debug;

/// Stored document shape
pub type Document = Map<String, Value>;

/// Store-native identifier field
pub const ID_FIELD: &str = "_id";

/// Persisted collection name
pub const COLLECTION_NAME: &str = "configurations";

/// Match-any equality filter
///
/// A document matches when any clause's field equals the clause's value.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyFilter {
    clauses: Vec<(String, Value)>,
}

impl KeyFilter {
    /// Single-field equality
    #[must_use]
    pub fn field(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            clauses: vec![(name.into(), value.into())],
        }
    }

    /// Same value under any of several field names
    #[must_use]
    pub fn any_of<I, S>(fields: I, value: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            clauses: fields
                .into_iter()
                .map(|f| (f.into(), Value::String(value.to_string())))
                .collect(),
        }
    }

    /// Check a document against the filter
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        self.clauses
            .iter()
            .any(|(field, value)| document.get(field) == Some(value))
    }

    /// Filter clauses
    #[inline]
    #[must_use]
    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }
}

/// Field-level update applied to a matched document
///
/// `set` assignments overwrite. A `max` assignment is skipped only when the
/// stored value is comparable and already at or above the new one; absent,
/// null or incomparable values are overwritten. RFC 3339 strings compare as
/// instants, other strings lexicographically, numbers numerically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentUpdate {
    set: Vec<(String, Value)>,
    max: Vec<(String, Value)>,
}

impl DocumentUpdate {
    /// Create empty update
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a field
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.push((field.into(), value.into()));
        self
    }

    /// Raise a field to at least `value`
    #[must_use]
    pub fn max(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.max.push((field.into(), value.into()));
        self
    }

    /// Apply to a document in place
    pub fn apply_to(&self, document: &mut Document) {
        for (field, value) in &self.set {
            document.insert(field.clone(), value.clone());
        }
        for (field, value) in &self.max {
            let replace = match document.get(field) {
                None | Some(Value::Null) => true,
                Some(current) => !matches!(
                    compare_values(current, value),
                    Some(Ordering::Greater | Ordering::Equal)
                ),
            };
            if replace {
                document.insert(field.clone(), value.clone());
            }
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => {
            match (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
                (Ok(a), Ok(b)) => Some(a.cmp(&b)),
                (Err(_), Err(_)) => Some(a.cmp(b)),
                _ => None,
            }
        }
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        _ => None,
    }
}

/// Result of `replace_one`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// Existing document replaced with different content
    Replaced,
    /// Existing document already held identical content
    Unchanged,
    /// No match, new document inserted
    Upserted,
    /// No match and upsert not requested
    NoMatch,
}

/// Async document store over one collection
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    /// First document matching the filter, in insertion order
    async fn find_one(&self, filter: &KeyFilter) -> Result<Option<Document>, StoreError>;

    /// Atomically update the first match, or insert when nothing matches
    ///
    /// On a miss with `insert` supplied, the update is applied on top of the
    /// insert document before it is stored. Returns the post-image, or
    /// `None` on a miss without `insert`.
    async fn find_one_and_update(
        &self,
        filter: &KeyFilter,
        update: &DocumentUpdate,
        insert: Option<Document>,
    ) -> Result<Option<Document>, StoreError>;

    /// Atomically replace the first match, keeping its `_id`
    async fn replace_one(
        &self,
        filter: &KeyFilter,
        replacement: Document,
        upsert: bool,
    ) -> Result<ReplaceOutcome, StoreError>;

    /// Insert documents; all-or-nothing on unique-index violations
    async fn insert_many(&self, documents: Vec<Document>) -> Result<usize, StoreError>;

    /// All documents in insertion order
    async fn find_all(&self) -> Result<Vec<Document>, StoreError>;

    /// Remove every document; returns whether the collection held any
    async fn drop_collection(&self) -> Result<bool, StoreError>;
}
