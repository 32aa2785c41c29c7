use std::{collections::HashMap, path::Path, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{
    deserialize_duration_from_ms, deserialize_duration_from_seconds, deserialize_optional_url,
    serialize_duration_to_ms, serialize_duration_to_seconds,
};

/// Prefix shared by every environment variable the relay reads, e.g.
/// `TELEMETRY_ALERT_WEBHOOK` or `TELEMETRY_ALERT_THRESHOLD`.
pub const ENV_PREFIX: &str = "TELEMETRY_ALERT";

/// Provides the default value for listen_address.
fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

/// Provides the default value for threshold.
fn default_threshold() -> u64 {
    3
}

/// Provides the default value for window_ms.
fn default_window() -> Duration {
    Duration::from_millis(60_000)
}

/// Provides the default value for webhook_timeout_ms.
fn default_webhook_timeout() -> Duration {
    Duration::from_millis(5_000)
}

/// Provides the default value for sweep_interval_secs.
fn default_sweep_interval() -> Duration {
    Duration::from_secs(300)
}

/// Application configuration for the alert relay.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Address and port for the HTTP server to listen on.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Destination for forwarded alerts. Forwarding is disabled when unset.
    #[serde(default, deserialize_with = "deserialize_optional_url")]
    pub webhook: Option<Url>,

    /// Occurrences within the window required before a non-critical event is
    /// forwarded.
    #[serde(default = "default_threshold")]
    pub threshold: u64,

    /// Length of the trailing window occurrences are counted over.
    #[serde(
        default = "default_window",
        deserialize_with = "deserialize_duration_from_ms",
        serialize_with = "serialize_duration_to_ms"
    )]
    pub window_ms: Duration,

    /// Upper bound on a single outbound webhook request.
    #[serde(
        default = "default_webhook_timeout",
        deserialize_with = "deserialize_duration_from_ms",
        serialize_with = "serialize_duration_to_ms"
    )]
    pub webhook_timeout_ms: Duration,

    /// Optional HMAC secret used to sign outbound payloads.
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Extra headers sent with every outbound webhook request.
    #[serde(default)]
    pub webhook_headers: HashMap<String, String>,

    /// SQLite database shared between relay instances. When unset, counts are
    /// kept in process memory.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Interval between sweeps that evict fingerprints with no recent events.
    /// Zero disables the sweeper.
    #[serde(
        default = "default_sweep_interval",
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds"
    )]
    pub sweep_interval_secs: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            webhook: None,
            threshold: default_threshold(),
            window_ms: default_window(),
            webhook_timeout_ms: default_webhook_timeout(),
            webhook_secret: None,
            webhook_headers: HashMap::new(),
            database_url: None,
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl AppConfig {
    /// Creates a new `AppConfig` from the optional `app.yaml` in the
    /// configuration directory, overridden by `TELEMETRY_ALERT_*` environment
    /// variables.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir = config_dir.unwrap_or("configs");
        let file_path = Path::new(config_dir).join("app.yaml");
        let s = Config::builder()
            .add_source(File::from(file_path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;
        s.try_deserialize()
    }

    /// The counting window in milliseconds, as used by the event stores.
    pub fn window_millis(&self) -> i64 {
        i64::try_from(self.window_ms.as_millis()).unwrap_or(i64::MAX)
    }

    /// Returns a copy that is safe to print, with the signing secret masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.webhook_secret.is_some() {
            copy.webhook_secret = Some("***".to_string());
        }
        copy
    }
}
