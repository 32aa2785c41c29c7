#![warn(missing_docs)]
//! alert-relay deduplicates client-side telemetry events and relays the ones
//! worth paging about to a Slack-compatible webhook.

pub mod config;
pub mod engine;
pub mod http_server;
pub mod models;
pub mod notification;
pub mod persistence;
pub mod supervisor;
