//! Builds the Slack-compatible message relayed for an alert.

use serde::Serialize;

use crate::models::AlertEvent;

/// Rendered in place of optional fields the client did not report.
const MISSING: &str = "n/a";

/// The JSON body posted to the webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    /// One line per field, newline separated.
    pub text: String,
}

impl WebhookPayload {
    /// Builds the payload for an event that has been seen `count` times in the
    /// current window.
    pub fn for_event(event_name: &str, event: &AlertEvent, count: usize) -> Self {
        Self { text: format_alert_text(event_name, event, count) }
    }
}

/// Formats the alert text:
///
/// ```text
/// <event> reported (build <sha>)
/// • Message: <message>
/// • Count in window: <n>
/// • URL: <url>
/// ```
///
/// The build suffix is omitted when no build SHA was reported.
pub fn format_alert_text(event_name: &str, event: &AlertEvent, count: usize) -> String {
    let headline = match event.build() {
        Some(sha) => format!("{event_name} reported (build {sha})"),
        None => format!("{event_name} reported"),
    };
    let message = event.message.as_deref().unwrap_or(MISSING);
    let url = event.url.as_deref().unwrap_or(MISSING);

    format!("{headline}\n• Message: {message}\n• Count in window: {count}\n• URL: {url}")
}
