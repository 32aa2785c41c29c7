//! Defines the custom `ApiError` type for the HTTP server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::{engine::AlertManagerError, persistence::error::PersistenceError};

/// A custom error type for the API that can be converted into an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// The request is missing something the relay needs.
    BadRequest(String),

    /// Anything else: malformed JSON, store failures, webhook failures.
    InternalServerError(String),
}

impl From<AlertManagerError> for ApiError {
    fn from(err: AlertManagerError) -> Self {
        match err {
            AlertManagerError::MissingEvent => ApiError::BadRequest(err.to_string()),
            _ => ApiError::InternalServerError(err.to_string()),
        }
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        ApiError::InternalServerError(err.to_string())
    }
}

/// Implements the conversion from `ApiError` into an `axum` response.
///
/// Telemetry beacons drop failed requests, so the error text is returned as
/// is rather than masked.
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::BadRequest(reason) =>
                (StatusCode::BAD_REQUEST, json!({ "ok": false, "reason": reason })),
            ApiError::InternalServerError(error) => {
                tracing::error!("Internal server error: {}", error);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "ok": false, "error": error }))
            }
        };

        (status, Json(body)).into_response()
    }
}
