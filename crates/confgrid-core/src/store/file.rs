//! JSON-file-backed document store
//!
//! Keeps the collection in a [`MemoryStore`] and writes a full snapshot to
//! disk after every mutation (temp file + rename). A failed snapshot rolls
//! the in-memory collection back, so a write either commits to disk or has
//! no effect. Reads wait for an in-flight commit, so they never observe a
//! mutation that is later rolled back.

use super::{
    Document, DocumentStore, DocumentUpdate, KeyFilter, MemoryStore, ReplaceOutcome,
    COLLECTION_NAME,
};
use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// On-disk layout
#[derive(Debug, Serialize, Deserialize)]
struct CollectionFile {
    collection: String,
    documents: Vec<Document>,
}

/// Document store persisted to a single JSON file
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
    /// Held exclusively across mutate, snapshot and rollback; shared by reads
    gate: RwLock<()>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading existing contents
    ///
    /// A missing file yields an empty collection; it is created on the first
    /// write.
    ///
    /// # Errors
    /// - `StoreError::Io` if the file exists but cannot be read
    /// - `StoreError::Corrupt` if it does not hold a collection
    /// - `StoreError::DuplicateKey` if it violates a unique index
    pub async fn open(path: impl Into<PathBuf>, inner: MemoryStore) -> Result<Self, StoreError> {
        let path = path.into();
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let file: CollectionFile = serde_json::from_slice(&bytes).map_err(|source| {
                    StoreError::Corrupt {
                        path: path.clone(),
                        source,
                    }
                })?;
                if file.collection != COLLECTION_NAME {
                    tracing::warn!(
                        path = %path.display(),
                        found = %file.collection,
                        "collection file names an unexpected collection"
                    );
                }
                tracing::debug!(
                    path = %path.display(),
                    documents = file.documents.len(),
                    "loaded collection file"
                );
                inner.load(file.documents)?;
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "collection file absent, starting empty");
            }
            Err(err) => return Err(StoreError::io_error(path, err)),
        }

        Ok(Self {
            path,
            inner,
            gate: RwLock::new(()),
        })
    }

    /// Backing file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a mutation and persist it, rolling back on persist failure
    async fn commit<T, F>(&self, mutate: F) -> Result<T, StoreError>
    where
        F: FnOnce(&MemoryStore) -> Result<T, StoreError>,
    {
        let _gate = self.gate.write().await;
        let before = self.inner.snapshot();
        let value = mutate(&self.inner)?;
        let after = self.inner.snapshot();
        if after == before {
            return Ok(value);
        }
        if let Err(err) = self.persist(after).await {
            tracing::error!(path = %self.path.display(), error = %err, "snapshot write failed, rolling back");
            self.inner.restore_snapshot(before);
            return Err(err);
        }
        Ok(value)
    }

    async fn persist(&self, documents: Vec<Document>) -> Result<(), StoreError> {
        let file = CollectionFile {
            collection: COLLECTION_NAME.to_string(),
            documents,
        };
        let bytes = serde_json::to_vec_pretty(&file)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io_error(parent, e))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| StoreError::io_error(&tmp, e))?;
        if let Err(err) = tokio::fs::rename(&tmp, &self.path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                tracing::warn!(path = %tmp.display(), error = %cleanup, "stale snapshot left behind");
            }
            return Err(StoreError::io_error(&self.path, err));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn find_one(&self, filter: &KeyFilter) -> Result<Option<Document>, StoreError> {
        let _gate = self.gate.read().await;
        Ok(self.inner.find_one_now(filter))
    }

    async fn find_one_and_update(
        &self,
        filter: &KeyFilter,
        update: &DocumentUpdate,
        insert: Option<Document>,
    ) -> Result<Option<Document>, StoreError> {
        self.commit(|inner| inner.find_one_and_update_now(filter, update, insert))
            .await
    }

    async fn replace_one(
        &self,
        filter: &KeyFilter,
        replacement: Document,
        upsert: bool,
    ) -> Result<ReplaceOutcome, StoreError> {
        self.commit(|inner| inner.replace_one_now(filter, replacement, upsert))
            .await
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<usize, StoreError> {
        self.commit(|inner| inner.insert_many_now(documents)).await
    }

    async fn find_all(&self) -> Result<Vec<Document>, StoreError> {
        let _gate = self.gate.read().await;
        Ok(self.inner.snapshot())
    }

    async fn drop_collection(&self) -> Result<bool, StoreError> {
        self.commit(|inner| Ok(inner.drop_now())).await
    }
}
