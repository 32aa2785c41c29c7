//! Error types for webhook forwarding.

use thiserror::Error;

/// Defines the possible errors that can occur while forwarding an alert.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// An error related to invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The webhook was reached but did not accept the alert.
    #[error("Notification failed: {0}")]
    NotifyFailed(String),

    /// An internal error that should not occur under normal circumstances.
    #[error("Internal error: {0}")]
    InternalError(String),

    /// The request could not be sent or timed out.
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),
}
