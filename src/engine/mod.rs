//! Event recording, throttling and forwarding.

pub mod alert_manager;
pub mod forwarding_policy;
pub mod sweeper;

pub use alert_manager::{AlertManager, AlertManagerError, RelayOutcome, ThrottlePolicy};
pub use forwarding_policy::{ForwardRequest, should_forward_alert};
pub use sweeper::EvictionSweeper;
