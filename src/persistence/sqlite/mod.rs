//! This module provides a shared implementation of the EventWindowStore using
//! SQLite, so several relay instances pointed at the same database count
//! occurrences together.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::{
    models::EventKey,
    persistence::{error::PersistenceError, traits::EventWindowStore},
};

/// An EventWindowStore backed by the `alert_events` table.
pub struct SqliteEventStore {
    /// The SQLite connection pool used for database operations.
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Creates a new instance of SqliteEventStore with the provided database
    /// URL. This will create the database file if it does not exist.
    #[tracing::instrument(level = "info")]
    pub async fn new(database_url: &str) -> Result<Self, PersistenceError> {
        tracing::debug!(database_url, "Attempting to connect to SQLite database.");
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| PersistenceError::InvalidInput(e.to_string()))?
            .create_if_missing(true);

        // Every connection to `:memory:` opens its own database, so keep a
        // single connection alive for the lifetime of the pool.
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new().max_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            PersistenceError::OperationFailed(format!("Failed to connect to database: {}", e))
        })?;
        tracing::info!(database_url, "Successfully connected to SQLite database.");
        Ok(Self { pool })
    }

    /// Runs database migrations.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn run_migrations(&self) -> Result<(), PersistenceError> {
        tracing::debug!("Running database migrations.");
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run database migrations.");
            PersistenceError::MigrationError(e.to_string())
        })?;
        tracing::info!("Database migrations completed successfully.");
        Ok(())
    }

    /// Closes the connection pool gracefully.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn close(&self) {
        tracing::debug!("Closing SQLite connection pool.");
        self.pool.close().await;
        tracing::info!("SQLite connection pool closed successfully.");
    }

    /// Helper to execute database queries with consistent error handling
    async fn execute_query_with_error_handling<F, T, E>(
        &self,
        operation: &str,
        query_fn: F,
    ) -> Result<T, PersistenceError>
    where
        F: std::future::Future<Output = Result<T, E>>,
        E: std::error::Error,
    {
        query_fn.await.map_err(|e| {
            tracing::error!(error = %e, operation = %operation, "Database operation failed.");
            PersistenceError::OperationFailed(e.to_string())
        })
    }
}

fn to_count(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

#[async_trait]
impl EventWindowStore for SqliteEventStore {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn record_event(
        &self,
        key: &EventKey,
        now_ms: i64,
        window_ms: i64,
    ) -> Result<usize, PersistenceError> {
        let cutoff = now_ms.saturating_sub(window_ms);
        let fingerprint = key.as_str();

        let mut tx =
            self.execute_query_with_error_handling("begin record", self.pool.begin()).await?;

        self.execute_query_with_error_handling(
            "prune stale events",
            sqlx::query("DELETE FROM alert_events WHERE fingerprint = ? AND occurred_at_ms < ?")
                .bind(fingerprint)
                .bind(cutoff)
                .execute(&mut *tx),
        )
        .await?;

        self.execute_query_with_error_handling(
            "insert event",
            sqlx::query("INSERT INTO alert_events (fingerprint, occurred_at_ms) VALUES (?, ?)")
                .bind(fingerprint)
                .bind(now_ms)
                .execute(&mut *tx),
        )
        .await?;

        let count: i64 = self
            .execute_query_with_error_handling(
                "count events",
                sqlx::query_scalar("SELECT COUNT(*) FROM alert_events WHERE fingerprint = ?")
                    .bind(fingerprint)
                    .fetch_one(&mut *tx),
            )
            .await?;

        self.execute_query_with_error_handling("commit record", tx.commit()).await?;

        Ok(to_count(count))
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_event_count(
        &self,
        key: &EventKey,
        now_ms: i64,
        window_ms: i64,
    ) -> Result<usize, PersistenceError> {
        let cutoff = now_ms.saturating_sub(window_ms);
        let count: i64 = self
            .execute_query_with_error_handling(
                "count events in window",
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM alert_events WHERE fingerprint = ? AND occurred_at_ms \
                     >= ? AND occurred_at_ms <= ?",
                )
                .bind(key.as_str())
                .bind(cutoff)
                .bind(now_ms)
                .fetch_one(&self.pool),
            )
            .await?;
        Ok(to_count(count))
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn clear(&self) -> Result<(), PersistenceError> {
        self.execute_query_with_error_handling(
            "clear events",
            sqlx::query("DELETE FROM alert_events").execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn evict_expired(&self, now_ms: i64, window_ms: i64) -> Result<usize, PersistenceError> {
        let cutoff = now_ms.saturating_sub(window_ms);
        let mut tx =
            self.execute_query_with_error_handling("begin eviction", self.pool.begin()).await?;

        let before: i64 = self
            .execute_query_with_error_handling(
                "count fingerprints",
                sqlx::query_scalar("SELECT COUNT(DISTINCT fingerprint) FROM alert_events")
                    .fetch_one(&mut *tx),
            )
            .await?;

        self.execute_query_with_error_handling(
            "delete stale events",
            sqlx::query("DELETE FROM alert_events WHERE occurred_at_ms < ?")
                .bind(cutoff)
                .execute(&mut *tx),
        )
        .await?;

        let after: i64 = self
            .execute_query_with_error_handling(
                "count fingerprints",
                sqlx::query_scalar("SELECT COUNT(DISTINCT fingerprint) FROM alert_events")
                    .fetch_one(&mut *tx),
            )
            .await?;

        self.execute_query_with_error_handling("commit eviction", tx.commit()).await?;

        let evicted = to_count(before - after);
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted idle fingerprints from SQLite store.");
        }
        Ok(evicted)
    }

    async fn tracked_keys(&self) -> Result<usize, PersistenceError> {
        let count: i64 = self
            .execute_query_with_error_handling(
                "count fingerprints",
                sqlx::query_scalar("SELECT COUNT(DISTINCT fingerprint) FROM alert_events")
                    .fetch_one(&self.pool),
            )
            .await?;
        Ok(to_count(count))
    }
}
