//! This module contains the event window stores used for deduplication.

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;

use std::sync::Arc;

pub use memory::InMemoryEventStore;
pub use sqlite::SqliteEventStore;
use traits::EventWindowStore;

use crate::config::AppConfig;
use error::PersistenceError;

/// Builds the store selected by the configuration: SQLite when a database URL
/// is set, process memory otherwise.
pub async fn build_store(
    config: &AppConfig,
) -> Result<Arc<dyn EventWindowStore>, PersistenceError> {
    match config.database_url.as_deref().filter(|url| !url.is_empty()) {
        Some(url) => {
            let store = SqliteEventStore::new(url).await?;
            store.run_migrations().await?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("No database configured, counting occurrences in process memory.");
            Ok(Arc::new(InMemoryEventStore::new()))
        }
    }
}
