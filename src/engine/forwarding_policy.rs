//! Decides whether an occurrence is worth paging someone about.

use crate::{
    models::{EventKey, Severity},
    persistence::{error::PersistenceError, traits::EventWindowStore},
};

/// Occurrences needed before a non-critical event is forwarded.
pub const DEFAULT_THRESHOLD: u64 = 3;

/// Trailing window occurrences are counted over, in milliseconds.
pub const DEFAULT_WINDOW_MS: i64 = 60_000;

/// Inputs to [`should_forward_alert`].
#[derive(Debug, Clone)]
pub struct ForwardRequest<'a> {
    /// Fingerprint the occurrence was recorded under.
    pub key: &'a EventKey,
    /// Severity of the occurrence.
    pub severity: Severity,
    /// Minimum window count for non-critical events.
    pub threshold: u64,
    /// Current time in milliseconds since the Unix epoch.
    pub now_ms: i64,
    /// Window length in milliseconds.
    pub window_ms: i64,
}

impl<'a> ForwardRequest<'a> {
    /// A warning-level request with the default threshold and window.
    pub fn new(key: &'a EventKey, now_ms: i64) -> Self {
        Self {
            key,
            severity: Severity::default(),
            threshold: DEFAULT_THRESHOLD,
            now_ms,
            window_ms: DEFAULT_WINDOW_MS,
        }
    }

    /// Sets the severity.
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the threshold.
    pub fn threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the window length.
    pub fn window_ms(mut self, window_ms: i64) -> Self {
        self.window_ms = window_ms;
        self
    }
}

/// Critical events are always forwarded. Everything else is forwarded once
/// the key's count within the window reaches the threshold.
///
/// Only reads from the store.
pub async fn should_forward_alert<S>(
    store: &S,
    request: ForwardRequest<'_>,
) -> Result<bool, PersistenceError>
where
    S: EventWindowStore + ?Sized,
{
    if request.severity.is_critical() {
        return Ok(true);
    }

    let count = store.get_event_count(request.key, request.now_ms, request.window_ms).await?;
    Ok(count as u64 >= request.threshold)
}
