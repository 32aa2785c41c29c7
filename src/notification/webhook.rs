//! Webhook notification implementation.
//!
//! Posts alert payloads as JSON to a single configured webhook. Each request
//! is bounded by a timeout and is never retried.

use std::{collections::HashMap, time::Duration};

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{
    Client,
    header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use sha2::Sha256;
use url::Url;

use super::{error::NotificationError, payload::WebhookPayload};
use crate::config::AppConfig;

/// HMAC SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Represents a webhook configuration
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Destination URL.
    pub url: Url,
    /// Upper bound on a single request, connection included.
    pub timeout: Duration,
    /// Optional secret used to sign the request body.
    pub secret: Option<String>,
    /// Extra headers sent with every request.
    pub headers: HashMap<String, String>,
}

impl WebhookConfig {
    /// Extracts the webhook settings, or `None` when no webhook is configured.
    pub fn from_app_config(config: &AppConfig) -> Option<Self> {
        config.webhook.clone().map(|url| Self {
            url,
            timeout: config.webhook_timeout_ms,
            secret: config.webhook_secret.clone().filter(|s| !s.is_empty()),
            headers: config.webhook_headers.clone(),
        })
    }
}

/// Sends alert payloads to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: Url,
    client: Client,
    secret: Option<String>,
    headers: HeaderMap,
}

impl WebhookNotifier {
    /// Creates a new notifier, validating the configured headers up front.
    pub fn new(config: WebhookConfig) -> Result<Self, NotificationError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                NotificationError::ConfigError(format!("Invalid header name: {key}: {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                NotificationError::ConfigError(format!("Invalid header value for {key}: {e}"))
            })?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotificationError::ConfigError(format!("Invalid HTTP client: {e}")))?;

        Ok(Self { url: config.url, client, secret: config.secret, headers })
    }

    /// The destination URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Posts the payload once. Any non-2xx status is an error.
    #[tracing::instrument(skip_all, fields(url = %self.url))]
    pub async fn notify(&self, payload: &WebhookPayload) -> Result<(), NotificationError> {
        let body = serde_json::to_string(payload).map_err(|e| {
            NotificationError::InternalError(format!("Failed to serialize payload: {e}"))
        })?;

        let mut headers = self.headers.clone();
        if let Some(secret) = &self.secret {
            let timestamp = Utc::now().timestamp_millis().to_string();
            let signature = sign_payload(secret, &body, &timestamp)?;
            headers.insert(
                HeaderName::from_static("x-signature"),
                HeaderValue::from_str(&signature).map_err(|e| {
                    NotificationError::InternalError(format!("Invalid signature value: {e}"))
                })?,
            );
            headers.insert(
                HeaderName::from_static("x-timestamp"),
                HeaderValue::from_str(&timestamp).map_err(|e| {
                    NotificationError::InternalError(format!("Invalid timestamp value: {e}"))
                })?,
            );
        }

        let response =
            self.client.post(self.url.clone()).headers(headers).body(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::NotifyFailed(format!(
                "Webhook request failed with status: {status}"
            )));
        }

        tracing::debug!(%status, "Webhook accepted alert.");
        Ok(())
    }
}

/// Signs `{body}{timestamp}` with HMAC-SHA256 and returns the hex digest.
pub fn sign_payload(
    secret: &str,
    body: &str,
    timestamp: &str,
) -> Result<String, NotificationError> {
    // `new_from_slice` accepts empty keys, which would make the signature
    // meaningless.
    if secret.is_empty() {
        return Err(NotificationError::ConfigError("Invalid secret: cannot be empty.".to_string()));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| NotificationError::ConfigError(format!("Invalid secret: {e}")))?;
    mac.update(body.as_bytes());
    mac.update(timestamp.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}
