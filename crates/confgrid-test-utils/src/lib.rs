//! Testing utilities for confgrid workspace
//!
//! Shared fixtures: stores pre-loaded with canonical and legacy documents.

#![allow(missing_docs)]

use confgrid_core::{memory_store, ConfigurationRepository, Document, MemoryStore};
use serde_json::{json, Value};
use std::sync::Arc;

pub const ASSIGNMENT_KEY: &str = "qwertyuiop";

pub fn assignment_matrix() -> Value {
    json!([
        ["sym1", "sym2", "sym3"],
        ["sym4", "sym6", "sym8"],
        ["sym5", "sym1", "sym0"]
    ])
}

pub fn document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture documents must be objects, got {other}"),
    }
}

/// The assignment configuration with an empty remark
pub fn assignment_document() -> Document {
    document(json!({
        "configId": ASSIGNMENT_KEY,
        "data": assignment_matrix(),
        "remark": "",
        "createdAt": "2024-01-01T00:00:00.000000Z",
        "updatedAt": "2024-01-01T00:00:00.000000Z",
    }))
}

/// Documents in each historical shape
pub fn legacy_documents() -> Vec<Document> {
    vec![
        document(json!({
            "configurationId": "legacy-configuration",
            "configuration": [["c1", "c2"], ["c3", "c4"]],
            "remark": "legacy",
        })),
        document(json!({
            "_id": "legacy-native",
            "values": [["v1"]],
        })),
        document(json!({
            "configId": "legacy-empty",
            "data": "not-a-matrix",
        })),
    ]
}

pub fn store_with(documents: Vec<Document>) -> MemoryStore {
    let store = memory_store();
    store.load(documents).unwrap();
    store
}

pub fn seeded_store() -> MemoryStore {
    let mut documents = vec![assignment_document()];
    documents.extend(legacy_documents());
    store_with(documents)
}

pub fn seeded_repository() -> ConfigurationRepository {
    ConfigurationRepository::new(Arc::new(seeded_store()))
}

pub fn empty_repository() -> ConfigurationRepository {
    ConfigurationRepository::new(Arc::new(memory_store()))
}
