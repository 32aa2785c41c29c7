//! Process-local implementation of [`EventWindowStore`].

use async_trait::async_trait;
use dashmap::DashMap;

use super::{error::PersistenceError, traits::EventWindowStore};
use crate::models::EventKey;

/// Keeps occurrence timestamps in a concurrent map owned by this struct.
///
/// Counts are per process and lost on restart. Each key's update happens
/// under its shard lock, so concurrent requests for the same fingerprint
/// never lose an occurrence.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    records: DashMap<String, Vec<i64>>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timestamps physically stored for a key, stale ones included.
    pub fn stored_len(&self, key: &EventKey) -> usize {
        self.records.get(key.as_str()).map(|timestamps| timestamps.len()).unwrap_or(0)
    }
}

#[async_trait]
impl EventWindowStore for InMemoryEventStore {
    async fn record_event(
        &self,
        key: &EventKey,
        now_ms: i64,
        window_ms: i64,
    ) -> Result<usize, PersistenceError> {
        let cutoff = now_ms.saturating_sub(window_ms);
        let mut timestamps = self.records.entry(key.as_str().to_owned()).or_default();
        timestamps.push(now_ms);
        timestamps.retain(|&t| t >= cutoff);
        Ok(timestamps.len())
    }

    async fn get_event_count(
        &self,
        key: &EventKey,
        now_ms: i64,
        window_ms: i64,
    ) -> Result<usize, PersistenceError> {
        let cutoff = now_ms.saturating_sub(window_ms);
        let count = self
            .records
            .get(key.as_str())
            .map(|timestamps| timestamps.iter().filter(|&&t| t >= cutoff && t <= now_ms).count())
            .unwrap_or(0);
        Ok(count)
    }

    async fn clear(&self) -> Result<(), PersistenceError> {
        self.records.clear();
        Ok(())
    }

    async fn evict_expired(&self, now_ms: i64, window_ms: i64) -> Result<usize, PersistenceError> {
        let cutoff = now_ms.saturating_sub(window_ms);
        let before = self.records.len();
        self.records.retain(|_, timestamps| {
            timestamps.retain(|&t| t >= cutoff);
            !timestamps.is_empty()
        });
        let evicted = before.saturating_sub(self.records.len());
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted idle fingerprints from memory store.");
        }
        Ok(evicted)
    }

    async fn tracked_keys(&self) -> Result<usize, PersistenceError> {
        Ok(self.records.len())
    }
}
