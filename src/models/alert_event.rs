//! The telemetry event reported by clients and the fingerprint it is counted
//! under.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Build identifier used when a client does not report one.
pub const UNKNOWN_BUILD: &str = "unknown";

/// Severity of a reported event. Anything other than `critical` is throttled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    /// Forwarded only once the occurrence threshold is reached.
    #[default]
    Warning,
    /// Bypasses throttling and is forwarded on every occurrence.
    Critical,
    /// A severity label the relay does not know; treated like a warning.
    Other(String),
}

impl Severity {
    /// Whether this severity skips the threshold check.
    pub fn is_critical(&self) -> bool {
        matches!(self, Severity::Critical)
    }
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        match value.as_str() {
            "warning" => Severity::Warning,
            "critical" => Severity::Critical,
            _ => Severity::Other(value),
        }
    }
}

impl From<&str> for Severity {
    fn from(value: &str) -> Self {
        Severity::from(value.to_string())
    }
}

impl From<Severity> for String {
    fn from(value: Severity) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Critical => f.write_str("critical"),
            Severity::Other(label) => f.write_str(label),
        }
    }
}

/// The fingerprint occurrences are bucketed under: `{event}:{build}`.
///
/// Different builds never share a bucket, and all events without a build
/// identifier share the `unknown` build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey(String);

impl EventKey {
    /// Builds the fingerprint for an event name and optional build SHA.
    pub fn new(event: &str, build_sha: Option<&str>) -> Self {
        let build = build_sha.filter(|sha| !sha.is_empty()).unwrap_or(UNKNOWN_BUILD);
        Self(format!("{event}:{build}"))
    }

    /// The raw fingerprint string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A client-reported telemetry event, as received on the ingestion endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    /// Event name. Required; requests without it are rejected.
    #[serde(default)]
    pub event: Option<String>,

    /// Free-form description of what happened.
    #[serde(default)]
    pub message: Option<String>,

    /// Severity label, `warning` when omitted or null.
    #[serde(default, deserialize_with = "deserialize_nullable_severity")]
    pub severity: Severity,

    /// Page the event was reported from.
    #[serde(default)]
    pub url: Option<String>,

    /// Build the client was running.
    #[serde(default)]
    pub build_sha: Option<String>,
}

/// Reads an explicit `null` severity as the default instead of rejecting the
/// whole body.
fn deserialize_nullable_severity<'de, D>(deserializer: D) -> Result<Severity, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Severity>::deserialize(deserializer)?.unwrap_or_default())
}

impl AlertEvent {
    /// The event name, if present and non-empty.
    pub fn event_name(&self) -> Option<&str> {
        self.event.as_deref().filter(|name| !name.is_empty())
    }

    /// The build SHA, if present and non-empty.
    pub fn build(&self) -> Option<&str> {
        self.build_sha.as_deref().filter(|sha| !sha.is_empty())
    }

    /// The fingerprint for this event, or `None` when the event name is
    /// missing.
    pub fn fingerprint(&self) -> Option<EventKey> {
        self.event_name().map(|name| EventKey::new(name, self.build()))
    }
}
