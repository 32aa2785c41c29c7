//! The Supervisor module manages the lifecycle of the relay.
//!
//! It owns the event store, the alert manager and the background services
//! (HTTP server, eviction sweeper), starts them, and shuts everything down
//! together on SIGINT/SIGTERM or when any service fails.

use std::sync::Arc;

use thiserror::Error;
use tokio::{signal, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    engine::{AlertManager, EvictionSweeper},
    http_server,
    notification::NotificationError,
    persistence::{build_store, error::PersistenceError, traits::EventWindowStore},
};

/// Represents the set of errors that can occur during the supervisor's
/// operation.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The event store could not be opened or migrated.
    #[error("Event store error: {0}")]
    Persistence(#[from] PersistenceError),

    /// The webhook notifier could not be built from the configuration.
    #[error("Notifier error: {0}")]
    Notification(#[from] NotificationError),

    /// The HTTP server failed to bind or serve.
    #[error("HTTP server error: {0}")]
    Server(#[from] std::io::Error),

    /// A supervised task panicked or was aborted.
    #[error("Task failed: {0}")]
    TaskFailed(String),
}

/// The primary runtime manager for the application.
pub struct Supervisor {
    /// Shared application configuration.
    config: Arc<AppConfig>,

    /// Sliding-window event counts.
    store: Arc<dyn EventWindowStore>,

    /// Records, throttles and forwards events.
    alert_manager: Arc<AlertManager>,

    /// A token used to signal a graceful shutdown to all supervised tasks.
    cancellation_token: CancellationToken,

    /// A set of all spawned tasks that the supervisor is actively managing.
    join_set: JoinSet<Result<(), SupervisorError>>,
}

impl Supervisor {
    /// Creates a new Supervisor from already constructed components.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn EventWindowStore>,
        alert_manager: Arc<AlertManager>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            alert_manager,
            cancellation_token: CancellationToken::new(),
            join_set: JoinSet::new(),
        }
    }

    /// Opens the configured store and builds the alert manager.
    pub async fn from_config(config: AppConfig) -> Result<Self, SupervisorError> {
        tracing::debug!("Initializing event store...");
        let store = build_store(&config).await?;
        let alert_manager = Arc::new(AlertManager::from_config(&config, Arc::clone(&store))?);
        Ok(Self::new(config, store, alert_manager))
    }

    /// A handle that stops the supervisor when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Starts all services and waits until shutdown.
    ///
    /// Returns the first error reported by a service, if any.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        let cancellation_token = self.cancellation_token.clone();
        self.join_set.spawn(async move {
            wait_for_shutdown_signal(cancellation_token).await;
            Ok(())
        });

        let server_config = Arc::clone(&self.config);
        let server_alert_manager = Arc::clone(&self.alert_manager);
        let server_token = self.cancellation_token.clone();
        self.join_set.spawn(async move {
            http_server::run_server_from_config(server_config, server_alert_manager, server_token)
                .await
                .map_err(SupervisorError::from)
        });

        let sweeper = EvictionSweeper::new(
            Arc::clone(&self.store),
            self.config.sweep_interval_secs,
            self.config.window_millis(),
            self.cancellation_token.clone(),
        );
        self.join_set.spawn(async move {
            sweeper.run().await;
            Ok(())
        });

        tracing::info!(
            threshold = self.config.threshold,
            window_ms = self.config.window_millis(),
            "Alert relay started."
        );

        let mut first_error = None;
        loop {
            tokio::select! {
                maybe_result = self.join_set.join_next() => {
                    match maybe_result {
                        Some(Ok(Ok(()))) => {}
                        Some(Ok(Err(e))) => {
                            tracing::error!(error = %e, "A supervised service failed. Initiating shutdown.");
                            first_error.get_or_insert(e);
                            self.cancellation_token.cancel();
                        }
                        Some(Err(e)) => {
                            tracing::error!("A critical task failed: {:?}. Initiating shutdown.", e);
                            first_error.get_or_insert(SupervisorError::TaskFailed(e.to_string()));
                            self.cancellation_token.cancel();
                        }
                        None => break,
                    }
                }
                _ = self.cancellation_token.cancelled() => break,
            }
        }

        self.join_set.shutdown().await;
        tracing::info!("Supervisor shutdown complete.");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Resolves on SIGINT or SIGTERM, cancelling the token, or when the token is
/// cancelled elsewhere.
async fn wait_for_shutdown_signal(cancellation_token: CancellationToken) {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to register SIGTERM handler.");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
        _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
        _ = cancellation_token.cancelled() => return,
    }

    cancellation_token.cancel();
}
