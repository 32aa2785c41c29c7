//! Configuration module for the alert relay.

mod app_config;
mod helpers;

pub use app_config::{AppConfig, ENV_PREFIX};
pub use helpers::{
    deserialize_duration_from_ms, deserialize_duration_from_seconds, deserialize_optional_url,
    serialize_duration_to_ms, serialize_duration_to_seconds,
};
