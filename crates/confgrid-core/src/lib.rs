//! confgrid Core - configuration records over a legacy document collection
//!
//! Provides:
//! - Validated inputs (`ConfigKey`, `Remark`) and the canonical
//!   `ConfigurationRecord`
//! - Normalization of historically inconsistent key and payload field names
//! - The `DocumentStore` abstraction with in-memory and JSON-file backends
//! - `ConfigurationRepository`: strict `resolve`, atomic `upsert_remark`,
//!   plus seed / restore maintenance operations
//!
//! # Example
//!
//! ```rust,ignore
//! use confgrid_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repository = ConfigurationRepository::new(Arc::new(confgrid_core::memory_store()));
//!
//! let key = ConfigKey::parse("qwertyuiop")?;
//! repository.upsert_remark(&key, &Remark::parse("reviewed")?).await?;
//!
//! let record = repository.resolve(&key).await?;
//! assert_eq!(record.remark, "reviewed");
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod repository;
pub mod seed;
pub mod store;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

pub use error::{RepositoryError, StoreError, ValidationError};
pub use repository::normalize::{CANONICAL_KEY_FIELD, KEY_FIELDS, PAYLOAD_FIELDS};
pub use repository::{
    default_matrix, ConfigurationRepository, RestoreReport, SeedReport, DEFAULT_MATRIX,
};
pub use seed::{SeedConfiguration, RESTORE_REMARK, SEED_CONFIGURATIONS};
pub use store::{
    Document, DocumentStore, DocumentUpdate, JsonFileStore, KeyFilter, MemoryStore,
    ReplaceOutcome, COLLECTION_NAME, ID_FIELD,
};
pub use types::{ConfigKey, ConfigurationRecord, Matrix, MatrixSource, Remark};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with confgrid core
    pub use crate::{
        ConfigKey, ConfigurationRecord, ConfigurationRepository, DocumentStore, Matrix,
        MatrixSource, Remark, RepositoryError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// In-memory store with the canonical key index
#[must_use]
pub fn memory_store() -> MemoryStore {
    MemoryStore::new().with_unique_index(CANONICAL_KEY_FIELD)
}

/// Open the configured store
///
/// A data file selects the JSON-file backend; otherwise the collection lives
/// in memory for the lifetime of the process.
///
/// # Errors
/// Any `StoreError` raised while loading the data file
pub async fn open_store(data_file: Option<PathBuf>) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match data_file {
        Some(path) => {
            tracing::info!(path = %path.display(), "using file-backed configuration store");
            Ok(Arc::new(JsonFileStore::open(path, memory_store()).await?))
        }
        None => {
            tracing::info!("using in-memory configuration store");
            Ok(Arc::new(memory_store()))
        }
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn memory_store_enforces_canonical_key() {
        let repository = ConfigurationRepository::new(open_store(None).await.unwrap());
        let report = repository.seed(&SEED_CONFIGURATIONS).await.unwrap();
        assert!(!report.dropped_existing);

        let mut duplicate = Document::new();
        duplicate.insert(
            CANONICAL_KEY_FIELD.to_string(),
            serde_json::Value::String("qwertyuiop".to_string()),
        );
        let result = repository.store().insert_many(vec![duplicate]).await;
        assert!(matches!(result, Err(StoreError::DuplicateKey { .. })));
    }

    #[tokio::test]
    async fn file_store_round_trips_through_repository() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("configurations.json");
        let key = ConfigKey::parse("qwertyuiop").unwrap();

        {
            let repository =
                ConfigurationRepository::new(open_store(Some(path.clone())).await.unwrap());
            repository.seed(&SEED_CONFIGURATIONS).await.unwrap();
            repository
                .upsert_remark(&key, &Remark::parse("persisted").unwrap())
                .await
                .unwrap();
        }

        let repository = ConfigurationRepository::new(open_store(Some(path)).await.unwrap());
        let record = repository.resolve(&key).await.unwrap();
        assert_eq!(record.remark, "persisted");
        assert_eq!(record.matrix, default_matrix());
    }
}
