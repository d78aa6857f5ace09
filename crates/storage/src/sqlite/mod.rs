use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::document::ser;
use crate::repository::{AttemptRepository, Storage, StorageError, StudyPlanRepository};

mod attempt_repo;
mod migrate;
mod plan_repo;

/// Document store backed by a single `SQLite` table.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or
    /// the connection pragmas fail.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }

    /// Store a raw document body without validation, replacing any existing one.
    ///
    /// Used for imports and to reproduce malformed documents written by other clients.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the write fails.
    pub async fn insert_raw(
        &self,
        collection: &str,
        key: &str,
        body: &str,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO documents (collection, key, body)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(collection, key) DO UPDATE SET body = excluded.body
            ",
        )
        .bind(collection)
        .bind(key)
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}

/// Parse a `(key, body)` row. Bodies that are not JSON surface as `Value::Null`
/// so the typed decoder rejects them with the key attached.
fn map_document_row(row: &sqlx::sqlite::SqliteRow) -> Result<(String, Value), StorageError> {
    let key: String = row.try_get("key").map_err(ser)?;
    let body: String = row.try_get("body").map_err(ser)?;
    let value = serde_json::from_str(&body).unwrap_or(Value::Null);
    Ok((key, value))
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo.clone());
        let plans: Arc<dyn StudyPlanRepository> = Arc::new(repo);
        Ok(Self { attempts, plans })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }
}
