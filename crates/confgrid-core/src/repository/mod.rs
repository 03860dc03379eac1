//! Configuration repository
//!
//! Resolves external keys to canonical [`ConfigurationRecord`]s over a
//! [`DocumentStore`] whose documents use several historical field names.
//!
//! Miss policy is strict: `resolve` reports [`RepositoryError::NotFound`]
//! for unknown keys and never writes. Only `upsert_remark` (and the seed /
//! restore maintenance operations) create documents.

pub mod normalize;

use crate::error::RepositoryError;
use crate::seed::SeedConfiguration;
use crate::store::{Document, DocumentStore, DocumentUpdate, KeyFilter, ReplaceOutcome};
use crate::types::{ConfigKey, ConfigurationRecord, Matrix, Remark};
use chrono::{SecondsFormat, Utc};
use normalize::{normalize_record, CANONICAL_KEY_FIELD, CANONICAL_MATRIX_FIELD, KEY_FIELDS};
use serde_json::Value;
use std::sync::Arc;

/// Placeholder matrix substituted when a document has no usable payload
pub const DEFAULT_MATRIX: [[&str; 3]; 3] = [
    ["sym1", "sym2", "sym3"],
    ["sym4", "sym6", "sym8"],
    ["sym5", "sym1", "sym0"],
];

/// [`DEFAULT_MATRIX`] as a [`Matrix`]
#[must_use]
pub fn default_matrix() -> Matrix {
    Matrix::from_rows(DEFAULT_MATRIX)
}

/// Outcome of a seed run
#[derive(Debug, Clone)]
pub struct SeedReport {
    /// Whether the collection held documents before the drop
    pub dropped_existing: bool,
    /// Documents inserted
    pub inserted: usize,
    /// Records read back after insertion
    pub verified: Vec<ConfigurationRecord>,
}

/// Outcome of a restore run
#[derive(Debug, Clone)]
pub struct RestoreReport {
    /// What the replace did
    pub outcome: ReplaceOutcome,
    /// Record read back after the replace
    pub record: ConfigurationRecord,
}

/// Repository over the `configurations` collection
#[derive(Debug, Clone)]
pub struct ConfigurationRepository {
    store: Arc<dyn DocumentStore>,
}

impl ConfigurationRepository {
    /// Create repository over a store
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Resolve a key to its canonical record
    ///
    /// Matches the key under any recognized key field in one query. When
    /// several documents match, the store's first match is used.
    ///
    /// # Errors
    /// - `RepositoryError::NotFound` if no document matches
    /// - `RepositoryError::Storage` if the store read fails
    pub async fn resolve(&self, key: &ConfigKey) -> Result<ConfigurationRecord, RepositoryError> {
        tracing::info!(key = %key, "resolving configuration");

        let document = self
            .store
            .find_one(&key_filter(key))
            .await?
            .ok_or_else(|| {
                tracing::warn!(key = %key, "no configuration matches key");
                RepositoryError::NotFound(key.clone())
            })?;

        let record = normalize_record(key, &document);
        tracing::debug!(
            key = %key,
            source = ?record.matrix_source,
            rows = record.matrix.row_count(),
            "normalized configuration payload"
        );
        Ok(record)
    }

    /// Set the remark on a configuration, creating it when absent
    ///
    /// Runs as one atomic find-and-modify with upsert. An existing document
    /// only has `remark` and `updatedAt` touched; a new one is stored under
    /// the canonical key field with the default matrix. `updatedAt` never
    /// moves backwards.
    ///
    /// # Errors
    /// `RepositoryError::Storage` if the write cannot be committed
    pub async fn upsert_remark(
        &self,
        key: &ConfigKey,
        remark: &Remark,
    ) -> Result<ConfigurationRecord, RepositoryError> {
        tracing::info!(key = %key, "updating configuration remark");

        let now = timestamp_now();
        let update = DocumentUpdate::new()
            .set("remark", remark.as_str())
            .max("updatedAt", now.as_str());
        let insert = new_document(key, &default_matrix(), "", &now);

        let document = self
            .store
            .find_one_and_update(&key_filter(key), &update, Some(insert))
            .await
            .map_err(|err| {
                tracing::error!(key = %key, error = %err, "remark update failed");
                RepositoryError::from(err)
            })?
            .ok_or_else(|| RepositoryError::NotFound(key.clone()))?;

        let created = document.get("createdAt").and_then(Value::as_str) == Some(now.as_str());
        tracing::info!(key = %key, created, "configuration remark stored");
        Ok(normalize_record(key, &document))
    }

    /// Drop the collection and insert the given configurations
    ///
    /// Each inserted key is resolved again before returning.
    ///
    /// # Errors
    /// `RepositoryError::Storage` on any store failure, including duplicate
    /// keys within `fixtures`
    pub async fn seed(
        &self,
        fixtures: &[SeedConfiguration],
    ) -> Result<SeedReport, RepositoryError> {
        let dropped_existing = self.store.drop_collection().await?;
        tracing::info!(dropped_existing, "collection cleared for seeding");

        let now = timestamp_now();
        let documents = fixtures
            .iter()
            .map(|f| Ok(new_document(&f.key()?, &f.matrix(), f.remark, &now)))
            .collect::<Result<Vec<_>, RepositoryError>>()?;
        let inserted = self.store.insert_many(documents).await?;
        tracing::info!(inserted, "seed configurations inserted");

        let mut verified = Vec::with_capacity(fixtures.len());
        for fixture in fixtures {
            verified.push(self.resolve(&fixture.key()?).await?);
        }

        Ok(SeedReport {
            dropped_existing,
            inserted,
            verified,
        })
    }

    /// Replace (or create) one configuration with fixture content
    ///
    /// Matches on the canonical key field only. A document that already holds
    /// the fixture payload and `remark` is left alone and reported
    /// `Unchanged`, keeping its `updatedAt`.
    ///
    /// # Errors
    /// `RepositoryError::Storage` if the replace fails
    pub async fn restore(
        &self,
        fixture: &SeedConfiguration,
        remark: &str,
    ) -> Result<RestoreReport, RepositoryError> {
        let key = fixture.key()?;
        let filter = KeyFilter::field(CANONICAL_KEY_FIELD, key.as_str());
        let mut document = Document::new();
        document.insert(CANONICAL_KEY_FIELD.to_string(), Value::String(key.to_string()));
        document.insert(CANONICAL_MATRIX_FIELD.to_string(), fixture.matrix().to_json());
        document.insert("remark".to_string(), Value::String(remark.to_string()));

        let current = self.store.find_one(&filter).await?;
        let outcome = if current.is_some_and(|c| same_content(&c, &document)) {
            ReplaceOutcome::Unchanged
        } else {
            document.insert("updatedAt".to_string(), Value::String(timestamp_now()));
            self.store.replace_one(&filter, document, true).await?
        };
        tracing::info!(key = %key, ?outcome, "configuration restored");

        let record = self.resolve(&key).await?;
        Ok(RestoreReport { outcome, record })
    }

    /// Every stored document, unnormalized
    ///
    /// # Errors
    /// `RepositoryError::Storage` if the read fails
    pub async fn documents(&self) -> Result<Vec<Document>, RepositoryError> {
        Ok(self.store.find_all().await?)
    }
}

fn key_filter(key: &ConfigKey) -> KeyFilter {
    KeyFilter::any_of(KEY_FIELDS, key.as_str())
}

/// Every field of `expected` is present in `stored` with the same value
fn same_content(stored: &Document, expected: &Document) -> bool {
    expected.iter().all(|(field, value)| stored.get(field) == Some(value))
}

fn new_document(key: &ConfigKey, matrix: &Matrix, remark: &str, now: &str) -> Document {
    let mut document = Document::new();
    document.insert(CANONICAL_KEY_FIELD.to_string(), Value::String(key.to_string()));
    document.insert(CANONICAL_MATRIX_FIELD.to_string(), matrix.to_json());
    document.insert("remark".to_string(), Value::String(remark.to_string()));
    document.insert("createdAt".to_string(), Value::String(now.to_string()));
    document.insert("updatedAt".to_string(), Value::String(now.to_string()));
    document
}

/// Fixed-width RFC 3339, so string order is time order
fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::seed::{RESTORE_REMARK, SEED_CONFIGURATIONS};
    use crate::store::MemoryStore;
    use crate::types::MatrixSource;
    use async_trait::async_trait;
    use confgrid_test_utils::document as doc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn repository_with(documents: Vec<Value>) -> ConfigurationRepository {
        let store = MemoryStore::new().with_unique_index(CANONICAL_KEY_FIELD);
        store.load(documents.into_iter().map(doc).collect()).unwrap();
        ConfigurationRepository::new(Arc::new(store))
    }

    fn key(raw: &str) -> ConfigKey {
        ConfigKey::parse(raw).unwrap()
    }

    fn remark(raw: &str) -> Remark {
        Remark::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn unknown_key_is_not_found() {
        let repo = repository_with(vec![]);
        let err = repo.resolve(&key("doesnotexist123")).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(repo.documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolves_each_legacy_key_field() {
        let repo = repository_with(vec![
            json!({ "configId": "a", "data": [["1"]] }),
            json!({ "configurationId": "b", "configuration": [["2"]] }),
            json!({ "_id": "c", "values": [["3"]] }),
        ]);

        assert_eq!(repo.resolve(&key("a")).await.unwrap().matrix, Matrix::from_rows([["1"]]));
        assert_eq!(repo.resolve(&key("b")).await.unwrap().matrix, Matrix::from_rows([["2"]]));
        assert_eq!(repo.resolve(&key("c")).await.unwrap().matrix, Matrix::from_rows([["3"]]));
    }

    #[tokio::test]
    async fn missing_payload_is_not_backfilled() {
        let repo = repository_with(vec![json!({ "configId": "bare" })]);

        let record = repo.resolve(&key("bare")).await.unwrap();
        assert_eq!(record.matrix, default_matrix());
        assert_eq!(record.matrix_source, MatrixSource::Default);
        assert_eq!(record.remark, "");

        let stored = repo.documents().await.unwrap();
        assert!(!stored[0].contains_key("data"));
    }

    #[tokio::test]
    async fn upsert_updates_only_remark_and_timestamp() {
        let repo = repository_with(vec![json!({
            "_id": "native",
            "configurationId": "legacy",
            "values": [["v"]],
            "remark": "old",
            "extra": true,
        })]);

        let record = repo.upsert_remark(&key("legacy"), &remark("  new ")).await.unwrap();
        assert_eq!(record.remark, "new");
        assert_eq!(record.matrix_source, MatrixSource::Values);

        let stored = repo.documents().await.unwrap();
        assert_eq!(stored.len(), 1);
        let d = &stored[0];
        assert_eq!(d["_id"], json!("native"));
        assert_eq!(d["configurationId"], json!("legacy"));
        assert_eq!(d["values"], json!([["v"]]));
        assert_eq!(d["extra"], json!(true));
        assert!(!d.contains_key("configId"));
        assert!(d.contains_key("updatedAt"));
    }

    #[tokio::test]
    async fn upsert_creates_canonical_document() {
        let repo = repository_with(vec![]);

        let record = repo.upsert_remark(&key("fresh"), &remark("first")).await.unwrap();
        assert_eq!(record.matrix, default_matrix());
        assert_eq!(record.matrix_source, MatrixSource::Data);
        assert!(record.created_at.is_some());
        assert_eq!(record.created_at, record.updated_at);

        let stored = repo.documents().await.unwrap();
        assert_eq!(stored[0]["configId"], json!("fresh"));
        assert_eq!(stored[0]["remark"], json!("first"));
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let repo = repository_with(vec![]);
        let k = key("idem");
        let r = remark("same");

        let first = repo.upsert_remark(&k, &r).await.unwrap();
        let second = repo.upsert_remark(&k, &r).await.unwrap();

        assert_eq!(first.remark, second.remark);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(repo.documents().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn updated_at_never_moves_backwards() {
        let future = "2999-01-01T00:00:00.000000Z";
        let repo = repository_with(vec![json!({ "configId": "k", "updatedAt": future })]);

        let record = repo.upsert_remark(&key("k"), &remark("x")).await.unwrap();
        assert_eq!(
            record.updated_at.map(|t| t.to_rfc3339_opts(SecondsFormat::Micros, true)),
            Some(future.to_string())
        );
    }

    #[tokio::test]
    async fn legacy_timestamps_are_replaced_on_update() {
        let repo = repository_with(vec![
            json!({ "configId": "millis", "updatedAt": 1_704_067_200_000_u64 }),
            json!({ "configId": "extended", "updatedAt": { "$date": "2024-01-01T00:00:00.000Z" } }),
            json!({ "configId": "display", "updatedAt": "Mon Jan 01 2024 00:00:00 GMT+0000" }),
        ]);

        for raw in ["millis", "extended", "display"] {
            let record = repo.upsert_remark(&key(raw), &remark("touched")).await.unwrap();
            assert!(record.updated_at.is_some(), "{raw}");
        }

        for stored in repo.documents().await.unwrap() {
            let updated = stored["updatedAt"].as_str().unwrap();
            assert!(chrono::DateTime::parse_from_rfc3339(updated).is_ok(), "{updated}");
        }
    }

    #[tokio::test]
    async fn concurrent_upserts_create_one_document() {
        let repo = repository_with(vec![]);
        let k = key("race");

        let updates = (0..32).map(|i| {
            let repo = repo.clone();
            let k = k.clone();
            tokio::spawn(async move { repo.upsert_remark(&k, &remark(&format!("r{i}"))).await })
        });
        for joined in futures::future::join_all(updates).await {
            joined.unwrap().unwrap();
        }

        assert_eq!(repo.documents().await.unwrap().len(), 1);
        assert!(repo.resolve(&k).await.unwrap().remark.starts_with('r'));
    }

    #[tokio::test]
    async fn seed_replaces_collection() {
        let repo = repository_with(vec![json!({ "configId": "stale" })]);

        let report = repo.seed(&SEED_CONFIGURATIONS).await.unwrap();
        assert!(report.dropped_existing);
        assert_eq!(report.inserted, SEED_CONFIGURATIONS.len());
        assert_eq!(report.verified.len(), SEED_CONFIGURATIONS.len());
        assert!(repo.resolve(&key("stale")).await.unwrap_err().is_not_found());

        let qwerty = repo.resolve(&key("qwertyuiop")).await.unwrap();
        assert_eq!(qwerty.matrix, default_matrix());
    }

    #[tokio::test]
    async fn restore_overwrites_payload_and_remark() {
        let repo = repository_with(vec![json!({
            "_id": "keep",
            "configId": "qwertyuiop",
            "data": [["LIVE", "DATA"]],
            "remark": "changed",
        })]);

        let report = repo.restore(&SEED_CONFIGURATIONS[0], RESTORE_REMARK).await.unwrap();
        assert_eq!(report.outcome, ReplaceOutcome::Replaced);
        assert_eq!(report.record.matrix, default_matrix());
        assert_eq!(report.record.remark, RESTORE_REMARK);
        assert_eq!(report.record.document_id.as_deref(), Some("keep"));
    }

    #[tokio::test]
    async fn repeated_restore_is_unchanged() {
        let repo = repository_with(vec![]);
        let first = repo.restore(&SEED_CONFIGURATIONS[0], RESTORE_REMARK).await.unwrap();
        assert_eq!(first.outcome, ReplaceOutcome::Upserted);

        let second = repo.restore(&SEED_CONFIGURATIONS[0], RESTORE_REMARK).await.unwrap();
        assert_eq!(second.outcome, ReplaceOutcome::Unchanged);
        assert_eq!(second.record.updated_at, first.record.updated_at);
        assert_eq!(repo.documents().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn restore_creates_when_absent() {
        let repo = repository_with(vec![]);
        let report = repo.restore(&SEED_CONFIGURATIONS[0], RESTORE_REMARK).await.unwrap();
        assert_eq!(report.outcome, ReplaceOutcome::Upserted);
    }

    #[derive(Debug)]
    struct FailingStore;

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn find_one(&self, _: &KeyFilter) -> Result<Option<Document>, StoreError> {
            Err(StoreError::io_error("/unreachable", std::io::ErrorKind::BrokenPipe.into()))
        }

        async fn find_one_and_update(
            &self,
            _: &KeyFilter,
            _: &DocumentUpdate,
            _: Option<Document>,
        ) -> Result<Option<Document>, StoreError> {
            Err(StoreError::io_error("/unreachable", std::io::ErrorKind::BrokenPipe.into()))
        }

        async fn replace_one(
            &self,
            _: &KeyFilter,
            _: Document,
            _: bool,
        ) -> Result<ReplaceOutcome, StoreError> {
            Err(StoreError::io_error("/unreachable", std::io::ErrorKind::BrokenPipe.into()))
        }

        async fn insert_many(&self, _: Vec<Document>) -> Result<usize, StoreError> {
            Err(StoreError::io_error("/unreachable", std::io::ErrorKind::BrokenPipe.into()))
        }

        async fn find_all(&self) -> Result<Vec<Document>, StoreError> {
            Ok(Vec::new())
        }

        async fn drop_collection(&self) -> Result<bool, StoreError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn store_failures_surface_as_storage_errors() {
        let repo = ConfigurationRepository::new(Arc::new(FailingStore));

        let err = repo.resolve(&key("k")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Storage(_)));

        let err = repo.upsert_remark(&key("k"), &remark("r")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Storage(_)));
    }
}
