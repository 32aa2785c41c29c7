//! HTTP server module

mod alerts;
mod error;
mod status;

use std::{sync::Arc, time::Instant};

use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post},
};
pub use error::ApiError;
use serde_json::json;
pub use status::StatusResponse;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{config::AppConfig, engine::AlertManager};

/// Path the telemetry beacon posts events to.
pub const ALERT_ROUTE: &str = "/api/telemetry/alert";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    /// Records, throttles and forwards events.
    pub alert_manager: Arc<AlertManager>,
    /// When the server started, for uptime reporting.
    pub started_at: Instant,
}

impl ApiState {
    /// Creates the state with the start time set to now.
    pub fn new(alert_manager: Arc<AlertManager>) -> Self {
        Self { alert_manager, started_at: Instant::now() }
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Builds the application router.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status::status))
        .route(ALERT_ROUTE, post(alerts::ingest_alert))
        .with_state(state)
}

/// Serves the API on an already bound listener until the token is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: ApiState,
    cancellation_token: CancellationToken,
) -> std::io::Result<()> {
    let app = create_router(state);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            cancellation_token.cancelled().await;
            tracing::info!("HTTP server received shutdown signal.");
        })
        .await
}

/// Runs the HTTP server based on the provided application configuration.
pub async fn run_server_from_config(
    config: Arc<AppConfig>,
    alert_manager: Arc<AlertManager>,
    cancellation_token: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.listen_address.as_str()).await?;
    tracing::info!(address = %listener.local_addr()?, "HTTP server listening.");
    serve(listener, ApiState::new(alert_manager), cancellation_token).await
}
