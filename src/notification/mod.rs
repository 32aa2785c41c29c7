//! Forwarding of alerts to an external webhook.

pub mod error;
pub mod payload;
pub mod webhook;

pub use error::NotificationError;
pub use payload::{WebhookPayload, format_alert_text};
pub use webhook::{WebhookConfig, WebhookNotifier};
