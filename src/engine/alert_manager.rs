//! Alert management module

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use super::forwarding_policy::{
    DEFAULT_THRESHOLD, DEFAULT_WINDOW_MS, ForwardRequest, should_forward_alert,
};
use crate::{
    config::AppConfig,
    models::{AlertEvent, EventKey},
    notification::{NotificationError, WebhookConfig, WebhookNotifier, WebhookPayload},
    persistence::{error::PersistenceError, traits::EventWindowStore},
};

/// Threshold and window applied to every incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    /// Occurrences needed before a non-critical event is forwarded.
    pub threshold: u64,
    /// Window length in milliseconds.
    pub window_ms: i64,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self { threshold: DEFAULT_THRESHOLD, window_ms: DEFAULT_WINDOW_MS }
    }
}

impl From<&AppConfig> for ThrottlePolicy {
    fn from(config: &AppConfig) -> Self {
        Self { threshold: config.threshold, window_ms: config.window_millis() }
    }
}

/// What happened to a single reported event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Recorded, but there is no webhook to forward to.
    NotConfigured {
        /// Occurrences in the window, this one included.
        count: usize,
    },
    /// Recorded and held back by the throttle.
    Suppressed {
        /// Occurrences in the window, this one included.
        count: usize,
    },
    /// Recorded and delivered to the webhook.
    Forwarded {
        /// Occurrences in the window, this one included.
        count: usize,
    },
}

impl RelayOutcome {
    /// Occurrences in the window, this one included.
    pub fn count(&self) -> usize {
        match *self {
            RelayOutcome::NotConfigured { count }
            | RelayOutcome::Suppressed { count }
            | RelayOutcome::Forwarded { count } => count,
        }
    }

    /// Whether the alert reached the webhook.
    pub fn is_forwarded(&self) -> bool {
        matches!(self, RelayOutcome::Forwarded { .. })
    }
}

/// Errors that can occur within the AlertManager
#[derive(Debug, Error)]
pub enum AlertManagerError {
    /// The event carried no name to fingerprint.
    #[error("missing event")]
    MissingEvent,

    /// Error occurred in the event store
    #[error("State repository error: {0}")]
    StateRepositoryError(#[from] PersistenceError),

    /// Error occurred while forwarding to the webhook
    #[error("Notification error: {0}")]
    NotificationError(#[from] NotificationError),
}

/// The AlertManager records every reported event, applies the throttle policy
/// and forwards the alerts that pass it to the webhook.
pub struct AlertManager {
    /// Sliding-window occurrence counts per fingerprint.
    store: Arc<dyn EventWindowStore>,

    /// Webhook destination; forwarding is disabled when absent.
    notifier: Option<WebhookNotifier>,

    /// Threshold and window in effect.
    policy: ThrottlePolicy,
}

impl AlertManager {
    /// Creates a new AlertManager instance
    pub fn new(
        store: Arc<dyn EventWindowStore>,
        notifier: Option<WebhookNotifier>,
        policy: ThrottlePolicy,
    ) -> Self {
        Self { store, notifier, policy }
    }

    /// Creates an AlertManager from the application configuration, building a
    /// notifier only when a webhook is configured.
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn EventWindowStore>,
    ) -> Result<Self, NotificationError> {
        let notifier =
            WebhookConfig::from_app_config(config).map(WebhookNotifier::new).transpose()?;
        match &notifier {
            Some(notifier) => tracing::info!(url = %notifier.url(), "Webhook forwarding enabled."),
            None => tracing::warn!("No webhook configured, events are counted but not forwarded."),
        }
        Ok(Self::new(store, notifier, ThrottlePolicy::from(config)))
    }

    /// The store occurrences are recorded in.
    pub fn store(&self) -> &Arc<dyn EventWindowStore> {
        &self.store
    }

    /// The throttle policy in effect.
    pub fn policy(&self) -> ThrottlePolicy {
        self.policy
    }

    /// Whether a webhook is configured.
    pub fn forwarding_enabled(&self) -> bool {
        self.notifier.is_some()
    }

    /// Processes an event reported now.
    pub async fn process_event(
        &self,
        event: &AlertEvent,
    ) -> Result<RelayOutcome, AlertManagerError> {
        self.process_event_at(event, Utc::now().timestamp_millis()).await
    }

    /// Processes an event reported at `now_ms`.
    ///
    /// The occurrence is always recorded first, so it counts towards the
    /// window even when forwarding is disabled or the webhook call fails.
    /// A failed webhook call is not retried.
    pub async fn process_event_at(
        &self,
        event: &AlertEvent,
        now_ms: i64,
    ) -> Result<RelayOutcome, AlertManagerError> {
        let event_name = event.event_name().ok_or(AlertManagerError::MissingEvent)?;
        let key = EventKey::new(event_name, event.build());

        let count = self.store.record_event(&key, now_ms, self.policy.window_ms).await?;

        let Some(notifier) = &self.notifier else {
            tracing::debug!(fingerprint = %key, count, "Recorded event without webhook.");
            return Ok(RelayOutcome::NotConfigured { count });
        };

        let request = ForwardRequest::new(&key, now_ms)
            .severity(event.severity.clone())
            .threshold(self.policy.threshold)
            .window_ms(self.policy.window_ms);
        if !should_forward_alert(self.store.as_ref(), request).await? {
            tracing::debug!(
                fingerprint = %key,
                count,
                threshold = self.policy.threshold,
                "Throttling alert below threshold."
            );
            return Ok(RelayOutcome::Suppressed { count });
        }

        let payload = WebhookPayload::for_event(event_name, event, count);
        if let Err(e) = notifier.notify(&payload).await {
            tracing::error!(fingerprint = %key, error = %e, "Failed to forward alert.");
            return Err(e.into());
        }

        tracing::info!(fingerprint = %key, count, severity = %event.severity, "Forwarded alert.");
        Ok(RelayOutcome::Forwarded { count })
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use url::Url;

    use super::*;
    use crate::{
        models::Severity,
        persistence::{memory::InMemoryEventStore, traits::MockEventWindowStore},
    };

    fn event(name: &str) -> AlertEvent {
        AlertEvent {
            event: Some(name.to_string()),
            build_sha: Some("b1".to_string()),
            ..Default::default()
        }
    }

    fn notifier(url: &str) -> WebhookNotifier {
        WebhookNotifier::new(WebhookConfig {
            url: Url::parse(url).unwrap(),
            timeout: Duration::from_secs(2),
            secret: None,
            headers: HashMap::new(),
        })
        .unwrap()
    }

    fn create_alert_manager(webhook: Option<&str>, threshold: u64) -> AlertManager {
        AlertManager::new(
            Arc::new(InMemoryEventStore::new()),
            webhook.map(notifier),
            ThrottlePolicy { threshold, window_ms: DEFAULT_WINDOW_MS },
        )
    }

    #[tokio::test]
    async fn test_missing_event_is_rejected_before_recording() {
        let mut store = MockEventWindowStore::new();
        store.expect_record_event().never();
        let alert_manager = AlertManager::new(Arc::new(store), None, ThrottlePolicy::default());

        let result = alert_manager.process_event_at(&AlertEvent::default(), 1_000).await;

        assert!(matches!(result, Err(AlertManagerError::MissingEvent)));
    }

    #[tokio::test]
    async fn test_without_webhook_still_records() {
        let alert_manager = create_alert_manager(None, 3);

        let first = alert_manager.process_event_at(&event("x"), 1_000).await.unwrap();
        let second = alert_manager.process_event_at(&event("x"), 1_100).await.unwrap();

        assert_eq!(first, RelayOutcome::NotConfigured { count: 1 });
        assert_eq!(second, RelayOutcome::NotConfigured { count: 2 });
        let key = EventKey::new("x", Some("b1"));
        let stored = alert_manager.store().get_event_count(&key, 1_100, DEFAULT_WINDOW_MS).await;
        assert_eq!(stored.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_forwards_once_threshold_reached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/").with_status(200).expect(1).create_async().await;
        let alert_manager = create_alert_manager(Some(server.url().as_str()), 2);

        let first = alert_manager.process_event_at(&event("x"), 1_000).await.unwrap();
        let second = alert_manager.process_event_at(&event("x"), 1_200).await.unwrap();

        assert_eq!(first, RelayOutcome::Suppressed { count: 1 });
        assert_eq!(second, RelayOutcome::Forwarded { count: 2 });
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_critical_forwards_first_occurrence() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/").with_status(200).expect(1).create_async().await;
        let alert_manager = create_alert_manager(Some(server.url().as_str()), 100);

        let critical = AlertEvent { severity: Severity::Critical, ..event("payment_down") };
        let outcome = alert_manager.process_event_at(&critical, 1_000).await.unwrap();

        assert_eq!(outcome, RelayOutcome::Forwarded { count: 1 });
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_forwarded_fingerprints_are_released_by_eviction() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/").with_status(200).expect(5).create_async().await;
        let alert_manager = create_alert_manager(Some(server.url().as_str()), 100);

        for i in 0..5 {
            let critical =
                AlertEvent { severity: Severity::Critical, ..event(&format!("crash_{i}")) };
            let outcome = alert_manager.process_event_at(&critical, 1_000).await.unwrap();
            assert!(outcome.is_forwarded());
        }
        mock.assert_async().await;

        let store = alert_manager.store();
        assert_eq!(store.tracked_keys().await.unwrap(), 5);
        assert_eq!(store.evict_expired(10_000_000, DEFAULT_WINDOW_MS).await.unwrap(), 5);
        assert_eq!(store.tracked_keys().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_builds_are_counted_separately() {
        let alert_manager = create_alert_manager(None, 3);
        let other_build = AlertEvent { build_sha: Some("b2".to_string()), ..event("x") };

        alert_manager.process_event_at(&event("x"), 1_000).await.unwrap();
        let outcome = alert_manager.process_event_at(&other_build, 1_000).await.unwrap();

        assert_eq!(outcome.count(), 1);
    }

    #[tokio::test]
    async fn test_webhook_failure_propagates_and_keeps_count() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/").with_status(502).expect(1).create_async().await;
        let alert_manager = create_alert_manager(Some(server.url().as_str()), 1);

        let result = alert_manager.process_event_at(&event("x"), 1_000).await;

        assert!(matches!(result, Err(AlertManagerError::NotificationError(_))));
        let key = EventKey::new("x", Some("b1"));
        let stored = alert_manager.store().get_event_count(&key, 1_000, DEFAULT_WINDOW_MS).await;
        assert_eq!(stored.unwrap(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut store = MockEventWindowStore::new();
        store
            .expect_record_event()
            .returning(|_, _, _| Err(PersistenceError::OperationFailed("locked".to_string())));
        let alert_manager = AlertManager::new(Arc::new(store), None, ThrottlePolicy::default());

        let result = alert_manager.process_event_at(&event("x"), 1_000).await;

        assert!(matches!(result, Err(AlertManagerError::StateRepositoryError(_))));
    }

    #[test]
    fn test_policy_from_config() {
        let config = AppConfig {
            threshold: 7,
            window_ms: Duration::from_millis(10_000),
            ..Default::default()
        };
        assert_eq!(
            ThrottlePolicy::from(&config),
            ThrottlePolicy { threshold: 7, window_ms: 10_000 }
        );
    }
}
