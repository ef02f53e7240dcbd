//! Persistent logging into the `logs` table.
//!
//! Log writes never fail the caller: a broken log row is itself logged to
//! the process logger and dropped. Every entry is mirrored to the process
//! logger so `RUST_LOG` output stays complete.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;

/// Persisted log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Logger appending to the `logs` table.
#[derive(Clone)]
pub struct DbLogger {
    pool: Arc<SqlitePool>,
}

impl DbLogger {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Writes a log entry. Errors are swallowed after a process-log warning.
    pub async fn log(
        &self,
        level: LogLevel,
        target_id: Option<i64>,
        url: Option<&str>,
        message: &str,
        details: Option<serde_json::Value>,
    ) {
        match level {
            LogLevel::Info => log::info!("{message}"),
            LogLevel::Warn => log::warn!("{message}"),
            LogLevel::Error => log::error!("{message}"),
        }

        let details_json = details.map(|d| d.to_string());
        let result = sqlx::query(
            "INSERT INTO logs (level, target_id, url, message, details, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(level.as_str())
        .bind(target_id)
        .bind(url)
        .bind(message)
        .bind(details_json)
        .bind(Utc::now())
        .execute(self.pool.as_ref())
        .await;

        if let Err(e) = result {
            log::warn!("Failed to persist log entry: {e}");
        }
    }

    pub async fn info(&self, target_id: Option<i64>, url: Option<&str>, message: &str) {
        self.log(LogLevel::Info, target_id, url, message, None).await;
    }

    pub async fn warn(&self, target_id: Option<i64>, url: Option<&str>, message: &str) {
        self.log(LogLevel::Warn, target_id, url, message, None).await;
    }

    pub async fn error(&self, target_id: Option<i64>, url: Option<&str>, message: &str) {
        self.log(LogLevel::Error, target_id, url, message, None)
            .await;
    }

    /// Variant carrying a structured details payload.
    pub async fn warn_with(
        &self,
        target_id: Option<i64>,
        url: Option<&str>,
        message: &str,
        details: serde_json::Value,
    ) {
        self.log(LogLevel::Warn, target_id, url, message, Some(details))
            .await;
    }

    pub async fn error_with(
        &self,
        target_id: Option<i64>,
        url: Option<&str>,
        message: &str,
        details: serde_json::Value,
    ) {
        self.log(LogLevel::Error, target_id, url, message, Some(details))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::run_migrations;

    async fn test_pool() -> Arc<SqlitePool> {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool");
        run_migrations(&pool).await.expect("migrations failed");
        Arc::new(pool)
    }

    #[tokio::test]
    async fn test_log_rows_are_appended() {
        let pool = test_pool().await;
        let logger = DbLogger::new(Arc::clone(&pool));

        logger.info(None, None, "run started").await;
        logger
            .warn_with(
                Some(1),
                Some("https://example.com/a"),
                "sub-sitemap fetch failed",
                serde_json::json!({"status": 500}),
            )
            .await;

        let rows: Vec<(String, Option<i64>, String)> =
            sqlx::query_as("SELECT level, target_id, message FROM logs ORDER BY id ASC")
                .fetch_all(pool.as_ref())
                .await
                .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "info");
        assert_eq!(rows[0].2, "run started");
        assert_eq!(rows[1].0, "warn");
        assert_eq!(rows[1].1, Some(1));
    }

    #[tokio::test]
    async fn test_details_stored_as_json() {
        let pool = test_pool().await;
        let logger = DbLogger::new(Arc::clone(&pool));
        logger
            .error_with(None, None, "boom", serde_json::json!({"code": 7}))
            .await;

        let details: Option<String> = sqlx::query_scalar("SELECT details FROM logs LIMIT 1")
            .fetch_one(pool.as_ref())
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&details.unwrap()).unwrap();
        assert_eq!(value["code"], 7);
    }
}
