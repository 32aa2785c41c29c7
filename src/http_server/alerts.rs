//! Handler for the telemetry alert ingestion endpoint.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use super::{ApiError, ApiState};
use crate::{engine::RelayOutcome, models::AlertEvent};

/// Records a client-reported event and forwards it to the webhook when the
/// throttle allows.
///
/// The body is parsed by hand so that malformed JSON is reported like any
/// other internal failure instead of through axum's extractor rejection.
pub async fn ingest_alert(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let event: AlertEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InternalServerError(format!("Invalid JSON body: {e}")))?;

    let outcome = state.alert_manager.process_event(&event).await?;

    let body = match outcome {
        RelayOutcome::NotConfigured { .. } => {
            json!({ "ok": true, "forwarded": false, "reason": "no webhook configured" })
        }
        RelayOutcome::Suppressed { count } => {
            json!({ "ok": true, "forwarded": false, "count": count })
        }
        RelayOutcome::Forwarded { count } => {
            json!({ "ok": true, "forwarded": true, "count": count })
        }
    };

    Ok((StatusCode::OK, Json(body)))
}
