use quiz_core::model::{CourseName, QuizAttemptRecord, UserId};

use super::{SqliteRepository, map_document_row};
use crate::document::{self, ATTEMPTS};
use crate::repository::{AttemptRepository, AttemptRow, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl SqliteRepository {
    async fn query_attempts(
        &self,
        field: Option<(&'static str, &str)>,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let rows = match field {
            Some((path, value)) => {
                sqlx::query(
                    r"
                        SELECT key, body FROM documents
                        WHERE collection = ?1
                          AND CASE WHEN json_valid(body) THEN json_extract(body, ?2) END = ?3
                        ORDER BY rowid ASC
                    ",
                )
                .bind(ATTEMPTS)
                .bind(path)
                .bind(value)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r"
                        SELECT key, body FROM documents
                        WHERE collection = ?1
                        ORDER BY rowid ASC
                    ",
                )
                .bind(ATTEMPTS)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(conn)?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in &rows {
            docs.push(map_document_row(row)?);
        }
        Ok(document::decode_attempts(docs))
    }
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, record: &QuizAttemptRecord) -> Result<String, StorageError> {
        let key = record.document_key();
        let body = document::encode(record)?.to_string();

        let res = sqlx::query(
            r"
                INSERT INTO documents (collection, key, body)
                VALUES (?1, ?2, ?3)
            ",
        )
        .bind(ATTEMPTS)
        .bind(&key)
        .bind(body)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(key),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StorageError::Conflict)
            }
            Err(e) => Err(conn(e)),
        }
    }

    async fn get_attempt(&self, key: &str) -> Result<QuizAttemptRecord, StorageError> {
        let row = sqlx::query(
            r"
                SELECT key, body FROM documents
                WHERE collection = ?1 AND key = ?2
            ",
        )
        .bind(ATTEMPTS)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        let (key, body) = map_document_row(&row)?;
        document::decode_attempt(&key, body)
    }

    async fn list_attempts(&self) -> Result<Vec<AttemptRow>, StorageError> {
        self.query_attempts(None).await
    }

    async fn list_attempts_for_user(&self, user: &UserId) -> Result<Vec<AttemptRow>, StorageError> {
        self.query_attempts(Some(("$.userId", user.as_str()))).await
    }

    async fn list_attempts_for_course(
        &self,
        course: &CourseName,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        self.query_attempts(Some(("$.course", course.as_str()))).await
    }
}
