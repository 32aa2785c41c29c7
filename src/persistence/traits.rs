//! The storage interface behind sliding-window event counting.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::error::PersistenceError;
use crate::models::EventKey;

/// Tracks recent occurrence timestamps (milliseconds since the Unix epoch)
/// per fingerprint.
///
/// Only `record_event` and `evict_expired` shrink storage. Counting is a pure
/// read and leaves stale timestamps in place.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventWindowStore: Send + Sync {
    /// Appends `now_ms` to the key's timestamps, drops timestamps older than
    /// `now_ms - window_ms` and returns how many remain.
    async fn record_event(
        &self,
        key: &EventKey,
        now_ms: i64,
        window_ms: i64,
    ) -> Result<usize, PersistenceError>;

    /// Counts the key's timestamps within `[now_ms - window_ms, now_ms]`
    /// without mutating storage.
    async fn get_event_count(
        &self,
        key: &EventKey,
        now_ms: i64,
        window_ms: i64,
    ) -> Result<usize, PersistenceError>;

    /// Removes every key.
    async fn clear(&self) -> Result<(), PersistenceError>;

    /// Prunes stale timestamps from every key and removes keys left empty.
    /// Returns the number of keys removed.
    async fn evict_expired(&self, now_ms: i64, window_ms: i64) -> Result<usize, PersistenceError>;

    /// Number of keys currently held, including ones whose timestamps are all
    /// stale but not yet evicted.
    async fn tracked_keys(&self) -> Result<usize, PersistenceError>;
}
