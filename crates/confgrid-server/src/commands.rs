//! Maintenance commands and their console reports

use crate::config::ServerConfig;
use crate::error::ConfigError;
use confgrid_core::{
    open_store, ConfigurationRecord, ConfigurationRepository, Document, ReplaceOutcome,
    RestoreReport, SeedReport, StoreError,
};

/// Repository over the configured store
///
/// # Errors
/// `StoreError` if the data file cannot be loaded
pub async fn open_repository(config: &ServerConfig) -> Result<ConfigurationRepository, StoreError> {
    let store = open_store(config.data_file.clone()).await?;
    Ok(ConfigurationRepository::new(store))
}

/// Fail unless a data file is configured
///
/// Maintenance against an in-memory store would be discarded on exit.
///
/// # Errors
/// `ConfigError::Invalid` naming `command`
pub fn require_data_file(config: &ServerConfig, command: &str) -> Result<(), ConfigError> {
    if config.data_file.is_some() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "'{command}' needs a data file; set data_file in the config or CONFGRID_DATA_FILE"
        )))
    }
}

/// Console lines for a seed run
#[must_use]
pub fn seed_report_lines(report: &SeedReport) -> Vec<String> {
    let mut lines = vec![
        "Seed Report:".to_string(),
        format!("  Existing collection dropped: {}", report.dropped_existing),
        format!("  Documents inserted: {}", report.inserted),
        "  Verified:".to_string(),
    ];
    lines.extend(report.verified.iter().map(|r| format!("    {}", record_summary(r))));
    lines
}

/// Console lines for a restore run
#[must_use]
pub fn restore_report_lines(report: &RestoreReport) -> Vec<String> {
    let outcome = match report.outcome {
        ReplaceOutcome::Replaced => "replaced",
        ReplaceOutcome::Unchanged => "unchanged",
        ReplaceOutcome::Upserted => "created",
        ReplaceOutcome::NoMatch => "not found",
    };
    vec![
        "Restore Report:".to_string(),
        format!("  Outcome: {outcome}"),
        format!("  Record: {}", record_summary(&report.record)),
    ]
}

/// Console lines for one resolved record
#[must_use]
pub fn record_lines(record: &ConfigurationRecord) -> Vec<String> {
    let mut lines = vec![
        format!("Configuration: {}", record.key),
        format!("  Stored id: {}", record.document_id.as_deref().unwrap_or("-")),
        format!(
            "  Matrix source: {}",
            record.matrix_source.field_name().unwrap_or("default")
        ),
        format!("  Remark: {:?}", record.remark),
        format!("  Created: {}", timestamp(record.created_at.as_ref())),
        format!("  Updated: {}", timestamp(record.updated_at.as_ref())),
        format!("  Updated since creation: {}", record.updated_since_creation()),
        "  Matrix:".to_string(),
    ];
    lines.extend(record.matrix.rows().iter().map(|row| format!("    {}", row.join(" "))));
    lines
}

/// Console lines for the raw collection
#[must_use]
pub fn document_lines(documents: &[Document]) -> Vec<String> {
    let mut lines = vec![format!("Documents: {}", documents.len())];
    lines.extend(
        documents
            .iter()
            .map(|d| format!("  {}", serde_json::Value::Object(d.clone()))),
    );
    lines
}

fn record_summary(record: &ConfigurationRecord) -> String {
    format!(
        "{} ({} rows, remark {:?})",
        record.key,
        record.matrix.row_count(),
        record.remark
    )
}

fn timestamp(value: Option<&chrono::DateTime<chrono::Utc>>) -> String {
    value.map_or_else(|| "-".to_string(), chrono::DateTime::to_rfc3339)
}
