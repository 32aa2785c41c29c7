//! Represents the `/status` endpoint handler and response structure.
//! Provides relay status and counters.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;

use super::{ApiError, ApiState};

/// Represents the response from the `/status` endpoint.
#[derive(Debug, Serialize, Clone)]
pub struct StatusResponse {
    /// The version of the application.
    pub version: String,
    /// The uptime of the application in seconds.
    pub uptime_secs: u64,
    /// Fingerprints currently held by the event store.
    pub tracked_fingerprints: usize,
    /// Whether a webhook is configured.
    pub forwarding_enabled: bool,
    /// Occurrences needed before a warning is forwarded.
    pub threshold: u64,
    /// Counting window in milliseconds.
    pub window_ms: i64,
}

/// Retrieves relay status.
pub async fn status(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let alert_manager = &state.alert_manager;
    let policy = alert_manager.policy();
    let response = StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        tracked_fingerprints: alert_manager.store().tracked_keys().await?,
        forwarding_enabled: alert_manager.forwarding_enabled(),
        threshold: policy.threshold,
        window_ms: policy.window_ms,
    };
    Ok((StatusCode::OK, Json(response)))
}
