//! In-memory document store
//!
//! The whole collection sits behind one `RwLock`, so each primitive
//! (including find-and-modify with upsert) runs as a single critical
//! section.

use super::{Document, DocumentStore, DocumentUpdate, KeyFilter, ReplaceOutcome, ID_FIELD};
use crate::error::StoreError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use ulid::Ulid;

/// Collection held in process memory
#[derive(Debug)]
pub struct MemoryStore {
    documents: RwLock<Vec<Document>>,
    /// Fields whose non-null values must be unique; always contains `_id`
    unique_fields: Vec<String>,
}

impl MemoryStore {
    /// Create empty store with only the `_id` index
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
            unique_fields: vec![ID_FIELD.to_string()],
        }
    }

    /// Add a unique index on `field`
    #[must_use]
    pub fn with_unique_index(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.unique_fields.contains(&field) {
            self.unique_fields.push(field);
        }
        self
    }

    /// Replace contents with pre-existing documents
    ///
    /// # Errors
    /// `StoreError::DuplicateKey` if the documents violate a unique index
    pub fn load(&self, documents: Vec<Document>) -> Result<(), StoreError> {
        let staged = self.stage(&[], documents)?;
        *self.documents.write() = staged;
        Ok(())
    }

    /// Copy of the current collection
    #[must_use]
    pub fn snapshot(&self) -> Vec<Document> {
        self.documents.read().clone()
    }

    /// Number of stored documents
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Whether the collection is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    pub(crate) fn restore_snapshot(&self, documents: Vec<Document>) {
        *self.documents.write() = documents;
    }

    pub(crate) fn find_one_now(&self, filter: &KeyFilter) -> Option<Document> {
        self.documents
            .read()
            .iter()
            .find(|d| filter.matches(d))
            .cloned()
    }

    pub(crate) fn find_one_and_update_now(
        &self,
        filter: &KeyFilter,
        update: &DocumentUpdate,
        insert: Option<Document>,
    ) -> Result<Option<Document>, StoreError> {
        let mut docs = self.documents.write();

        if let Some(idx) = docs.iter().position(|d| filter.matches(d)) {
            let mut updated = docs[idx].clone();
            update.apply_to(&mut updated);
            self.check_unique(&docs, &updated, Some(idx))?;
            docs[idx] = updated.clone();
            return Ok(Some(updated));
        }

        let Some(mut document) = insert else {
            return Ok(None);
        };
        update.apply_to(&mut document);
        ensure_id(&mut document);
        self.check_unique(&docs, &document, None)?;
        docs.push(document.clone());
        Ok(Some(document))
    }

    pub(crate) fn replace_one_now(
        &self,
        filter: &KeyFilter,
        mut replacement: Document,
        upsert: bool,
    ) -> Result<ReplaceOutcome, StoreError> {
        let mut docs = self.documents.write();

        if let Some(idx) = docs.iter().position(|d| filter.matches(d)) {
            if let Some(id) = docs[idx].get(ID_FIELD).cloned() {
                replacement.insert(ID_FIELD.to_string(), id);
            } else {
                ensure_id(&mut replacement);
            }
            if docs[idx] == replacement {
                return Ok(ReplaceOutcome::Unchanged);
            }
            self.check_unique(&docs, &replacement, Some(idx))?;
            docs[idx] = replacement;
            return Ok(ReplaceOutcome::Replaced);
        }

        if !upsert {
            return Ok(ReplaceOutcome::NoMatch);
        }
        ensure_id(&mut replacement);
        self.check_unique(&docs, &replacement, None)?;
        docs.push(replacement);
        Ok(ReplaceOutcome::Upserted)
    }

    pub(crate) fn insert_many_now(&self, documents: Vec<Document>) -> Result<usize, StoreError> {
        let mut docs = self.documents.write();
        let staged = self.stage(&docs, documents)?;
        let count = staged.len();
        docs.extend(staged);
        Ok(count)
    }

    pub(crate) fn drop_now(&self) -> bool {
        let mut docs = self.documents.write();
        let had_any = !docs.is_empty();
        docs.clear();
        had_any
    }

    /// Assign ids and check uniqueness against `existing` and the batch itself
    fn stage(
        &self,
        existing: &[Document],
        documents: Vec<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        let mut staged: Vec<Document> = Vec::with_capacity(documents.len());
        for mut document in documents {
            ensure_id(&mut document);
            self.check_unique(existing, &document, None)?;
            self.check_unique(&staged, &document, None)?;
            staged.push(document);
        }
        Ok(staged)
    }

    fn check_unique(
        &self,
        docs: &[Document],
        candidate: &Document,
        skip: Option<usize>,
    ) -> Result<(), StoreError> {
        for field in &self.unique_fields {
            let Some(value) = candidate.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = docs
                .iter()
                .enumerate()
                .any(|(i, d)| Some(i) != skip && d.get(field) == Some(value));
            if clash {
                return Err(StoreError::DuplicateKey {
                    field: field.clone(),
                    value: display_value(value),
                });
            }
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(&self, filter: &KeyFilter) -> Result<Option<Document>, StoreError> {
        Ok(self.find_one_now(filter))
    }

    async fn find_one_and_update(
        &self,
        filter: &KeyFilter,
        update: &DocumentUpdate,
        insert: Option<Document>,
    ) -> Result<Option<Document>, StoreError> {
        self.find_one_and_update_now(filter, update, insert)
    }

    async fn replace_one(
        &self,
        filter: &KeyFilter,
        replacement: Document,
        upsert: bool,
    ) -> Result<ReplaceOutcome, StoreError> {
        self.replace_one_now(filter, replacement, upsert)
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<usize, StoreError> {
        self.insert_many_now(documents)
    }

    async fn find_all(&self) -> Result<Vec<Document>, StoreError> {
        Ok(self.snapshot())
    }

    async fn drop_collection(&self) -> Result<bool, StoreError> {
        Ok(self.drop_now())
    }
}

fn ensure_id(document: &mut Document) {
    let missing = document.get(ID_FIELD).map_or(true, Value::is_null);
    if missing {
        document.insert(ID_FIELD.to_string(), Value::String(Ulid::new().to_string()));
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
