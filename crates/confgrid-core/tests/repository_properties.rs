//! Repository property tests
//!
//! Remark round-trips, idempotence and payload field priority over
//! arbitrary keys, remarks and matrices.

use confgrid_core::{
    memory_store, ConfigKey, ConfigurationRepository, Document, Matrix, MatrixSource, Remark,
    ValidationError,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn repository() -> ConfigurationRepository {
    ConfigurationRepository::new(Arc::new(memory_store()))
}

fn key_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,24}"
}

fn remark_strategy() -> impl Strategy<Value = String> {
    // Printable text with optional surrounding whitespace, at least one
    // non-space character.
    ("[ \t]{0,3}", "[A-Za-z0-9][A-Za-z0-9 .,!?-]{0,40}", "[ \t]{0,3}")
        .prop_map(|(lead, body, trail)| format!("{lead}{body}{trail}"))
}

fn matrix_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
    proptest::collection::vec(proptest::collection::vec("[a-z0-9]{1,6}", 1..5), 1..5)
}

proptest! {
    #[test]
    fn upsert_then_resolve_returns_trimmed_remark(
        raw_key in key_strategy(),
        raw_remark in remark_strategy(),
    ) {
        let rt = runtime();
        let repo = repository();
        let key = ConfigKey::parse(&raw_key).unwrap();
        let remark = Remark::parse(&raw_remark).unwrap();

        let record = rt.block_on(async {
            repo.upsert_remark(&key, &remark).await.unwrap();
            repo.resolve(&key).await.unwrap()
        });

        prop_assert_eq!(record.remark, raw_remark.trim());
    }

    #[test]
    fn repeated_upsert_keeps_remark_and_advances_timestamp(
        raw_key in key_strategy(),
        raw_remark in remark_strategy(),
        repeats in 2..5usize,
    ) {
        let rt = runtime();
        let repo = repository();
        let key = ConfigKey::parse(&raw_key).unwrap();
        let remark = Remark::parse(&raw_remark).unwrap();

        let records = rt.block_on(async {
            let mut out = Vec::new();
            for _ in 0..repeats {
                out.push(repo.upsert_remark(&key, &remark).await.unwrap());
            }
            out
        });

        for pair in records.windows(2) {
            prop_assert_eq!(&pair[0].remark, &pair[1].remark);
            prop_assert!(pair[1].updated_at >= pair[0].updated_at);
        }
        let stored = rt.block_on(repo.documents()).unwrap();
        prop_assert_eq!(stored.len(), 1);
    }

    #[test]
    fn data_field_always_wins(
        data in matrix_strategy(),
        configuration in matrix_strategy(),
        values in matrix_strategy(),
    ) {
        let rt = runtime();
        let store = memory_store();
        let mut document = Document::new();
        document.insert("configId".to_string(), json!("k"));
        document.insert("values".to_string(), json!(values));
        document.insert("configuration".to_string(), json!(configuration));
        document.insert("data".to_string(), json!(data.clone()));
        store.load(vec![document]).unwrap();

        let repo = ConfigurationRepository::new(Arc::new(store));
        let record = rt.block_on(repo.resolve(&ConfigKey::parse("k").unwrap())).unwrap();

        prop_assert_eq!(record.matrix, Matrix::new(data));
        prop_assert_eq!(record.matrix_source, MatrixSource::Data);
    }

    #[test]
    fn unknown_keys_are_never_created_by_resolve(raw_key in key_strategy()) {
        let rt = runtime();
        let repo = repository();
        let key = ConfigKey::parse(&raw_key).unwrap();

        let err = rt.block_on(repo.resolve(&key)).unwrap_err();
        prop_assert!(err.is_not_found());
        prop_assert!(rt.block_on(repo.documents()).unwrap().is_empty());
    }

    #[test]
    fn whitespace_remarks_are_rejected(raw in "[ \t\n]{0,8}") {
        prop_assert_eq!(Remark::parse(&raw), Err(ValidationError::BlankRemark));
    }
}

#[test]
fn blank_remark_leaves_store_untouched() {
    let rt = runtime();
    let repo = repository();
    let key = ConfigKey::parse("k").unwrap();
    rt.block_on(repo.upsert_remark(&key, &Remark::parse("kept").unwrap()))
        .unwrap();
    let before = rt.block_on(repo.documents()).unwrap();

    let body: Value = json!({ "remark": "" });
    assert_eq!(Remark::from_body(&body), Err(ValidationError::BlankRemark));

    assert_eq!(rt.block_on(repo.documents()).unwrap(), before);
}
