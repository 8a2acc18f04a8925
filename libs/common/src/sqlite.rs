//! SQLite client with a pooled sqlx connection
//!
//! WAL journal mode for concurrent reads, a busy timeout so concurrent
//! writers queue instead of failing, and foreign keys enforced. The record
//! store relies on SQLite's own row-level serialization for concurrent
//! mutations; nothing above it takes locks.

use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool as SqlxSqlitePool,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub type SqlitePool = SqlxSqlitePool;

#[derive(Clone)]
pub struct SqliteClient {
    pool: Arc<SqlitePool>,
    db_path: String,
}

impl SqliteClient {
    /// Create a new SQLite client
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        // Enable foreign key constraints
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await?;

        info!(
            "SQLite database connected with foreign keys enabled: {}",
            db_path_str
        );

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path_str,
        })
    }

    /// Create a read-only connection pool
    pub async fn new_readonly(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        if !db_path.as_ref().exists() {
            return Err(anyhow::anyhow!("Database file not found: {}", db_path_str));
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .journal_mode(SqliteJournalMode::Wal)
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path_str,
        })
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get database file path
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Check if database is accessible
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&*self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_and_ping() {
        let dir = tempfile::tempdir().unwrap();
        let client = SqliteClient::new(dir.path().join("test.db")).await.unwrap();
        client.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_readonly_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.db");
        assert!(SqliteClient::new_readonly(&missing).await.is_err());
    }
}
