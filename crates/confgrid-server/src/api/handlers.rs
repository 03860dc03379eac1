//! Request handlers
//!
//! Handlers never reject: every outcome, including failures, is rendered to a
//! response here so the fallback rejection handler only sees routing errors.

use super::{AppState, AVAILABLE_ROUTES};
use crate::error::{ApiError, Operation};
use chrono::{SecondsFormat, Utc};
use confgrid_core::{ConfigKey, Matrix, Remark, ValidationError};
use percent_encoding::percent_decode_str;
use serde_json::{json, Value};
use std::convert::Infallible;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::Reply;

/// `GET /`
pub async fn health() -> Result<Response, Infallible> {
    let body = json!({
        "message": "confgrid API is running",
        "status": "OK",
        "version": confgrid_core::VERSION,
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "endpoints": AVAILABLE_ROUTES,
    });
    Ok(warp::reply::json(&body).into_response())
}

/// `GET /api/configurations/:id`
pub async fn get_configuration(raw_id: String, state: AppState) -> Result<Response, Infallible> {
    Ok(match fetch_matrix(&raw_id, &state).await {
        Ok(matrix) => warp::reply::json(&matrix).into_response(),
        Err(err) => err.into_response(),
    })
}

/// `PUT /api/configurations/:id`
pub async fn update_configuration(
    raw_id: String,
    body: Bytes,
    state: AppState,
) -> Result<Response, Infallible> {
    Ok(match store_remark(&raw_id, &body, &state).await {
        Ok(()) => warp::reply::json(&json!({ "message": "success" })).into_response(),
        Err(err) => err.into_response(),
    })
}

/// `/api/configurations` with no id segment
pub async fn missing_id() -> Result<Response, Infallible> {
    Ok(ApiError::Validation(ValidationError::BlankKey).into_response())
}

/// Percent-decode a path segment into a key
fn decode_key(raw_id: &str) -> Result<ConfigKey, ApiError> {
    let decoded = percent_decode_str(raw_id)
        .decode_utf8()
        .map_err(|_| ApiError::InvalidIdEncoding)?;
    Ok(ConfigKey::parse(&decoded)?)
}

async fn fetch_matrix(raw_id: &str, state: &AppState) -> Result<Matrix, ApiError> {
    let key = decode_key(raw_id)?;
    let record = state
        .repository()
        .resolve(&key)
        .await
        .map_err(|e| ApiError::from_repository(e, Operation::Fetch))?;
    tracing::debug!(key = %key, source = ?record.matrix_source, "configuration served");
    Ok(record.matrix)
}

async fn store_remark(raw_id: &str, body: &[u8], state: &AppState) -> Result<(), ApiError> {
    let key = decode_key(raw_id)?;
    let body: Value =
        serde_json::from_slice(body).map_err(|e| ApiError::MalformedBody(e.to_string()))?;
    let remark = Remark::from_body(&body)?;
    state
        .repository()
        .upsert_remark(&key, &remark)
        .await
        .map_err(|e| ApiError::from_repository(e, Operation::Update))?;
    Ok(())
}
