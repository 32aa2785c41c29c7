//! This module contains the data models for the alert relay.

pub mod alert_event;

pub use alert_event::{AlertEvent, EventKey, Severity, UNKNOWN_BUILD};
