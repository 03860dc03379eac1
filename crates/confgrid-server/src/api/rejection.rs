//! Mapping of routing rejections to JSON responses

use super::AVAILABLE_ROUTES;
use serde_json::{json, Value};
use std::convert::Infallible;
use warp::cors::CorsForbidden;
use warp::http::StatusCode;
use warp::reject::{LengthRequired, MethodNotAllowed, PayloadTooLarge};
use warp::reply::Response;
use warp::{Rejection, Reply};

/// Render a rejection; unknown rejections become a generic 500
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, body) = classify(&err);
    if status.is_server_error() {
        tracing::error!(rejection = ?err, "unhandled rejection");
    } else {
        tracing::debug!(%status, rejection = ?err, "request rejected");
    }
    Ok(warp::reply::with_status(warp::reply::json(&body), status).into_response())
}

fn classify(err: &Rejection) -> (StatusCode, Value) {
    if err.is_not_found() {
        return (
            StatusCode::NOT_FOUND,
            json!({ "message": "Route not found", "availableRoutes": AVAILABLE_ROUTES }),
        );
    }
    if err.find::<CorsForbidden>().is_some() {
        return (
            StatusCode::FORBIDDEN,
            json!({ "message": "Origin not allowed" }),
        );
    }
    if err.find::<PayloadTooLarge>().is_some() {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            json!({ "message": "Request body too large" }),
        );
    }
    if err.find::<LengthRequired>().is_some() {
        return (
            StatusCode::LENGTH_REQUIRED,
            json!({ "message": "Content-Length header is required" }),
        );
    }
    if err.find::<MethodNotAllowed>().is_some() {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "message": "Method not allowed", "availableRoutes": AVAILABLE_ROUTES }),
        );
    }
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "message": "Internal server error" }),
    )
}
