use async_trait::async_trait;
use quiz_core::model::{CourseName, QuizAttemptRecord, StudyPlan, UserId};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::document::{self, ATTEMPTS, STUDY_PLANS};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A stored attempt together with its document key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRow {
    pub key: String,
    pub record: QuizAttemptRecord,
}

/// Append-only store of completed quiz attempts.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Write a new attempt under its document key and return the key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the key already exists; attempts are
    /// never overwritten.
    async fn append_attempt(&self, record: &QuizAttemptRecord) -> Result<String, StorageError>;

    /// Fetch one attempt by document key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or `Serialization` if the
    /// stored document is malformed.
    async fn get_attempt(&self, key: &str) -> Result<QuizAttemptRecord, StorageError>;

    /// Every attempt in the collection, in write order. Malformed documents are skipped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn list_attempts(&self) -> Result<Vec<AttemptRow>, StorageError>;

    /// Attempts whose `userId` field matches.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn list_attempts_for_user(&self, user: &UserId) -> Result<Vec<AttemptRow>, StorageError>;

    /// Attempts whose `course` field matches.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn list_attempts_for_course(
        &self,
        course: &CourseName,
    ) -> Result<Vec<AttemptRow>, StorageError>;
}

/// One study plan per user, replaced on every write.
#[async_trait]
pub trait StudyPlanRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored plan is malformed.
    async fn get_plan(&self, user: &UserId) -> Result<Option<StudyPlan>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the plan cannot be written.
    async fn put_plan(&self, plan: &StudyPlan) -> Result<(), StorageError>;
}

type Collection = Vec<(String, Value)>;

/// In-memory document store for tests and prototyping.
///
/// Holds raw JSON like the hosted store does, so reads exercise the same
/// decoding path as the `SQLite` backend.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    collections: Arc<Mutex<HashMap<&'static str, Collection>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw document without validation, replacing any existing body.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_raw(
        &self,
        collection: &'static str,
        key: impl Into<String>,
        body: Value,
    ) -> Result<(), StorageError> {
        let key = key.into();
        let mut guard = self.lock()?;
        let docs = guard.entry(collection).or_default();
        match docs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = body,
            None => docs.push((key, body)),
        }
        Ok(())
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<&'static str, Collection>>, StorageError> {
        self.collections
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn snapshot(&self, collection: &'static str) -> Result<Collection, StorageError> {
        let guard = self.lock()?;
        Ok(guard.get(collection).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, record: &QuizAttemptRecord) -> Result<String, StorageError> {
        let key = record.document_key();
        let body = document::encode(record)?;
        let mut guard = self.lock()?;
        let docs = guard.entry(ATTEMPTS).or_default();
        if docs.iter().any(|(k, _)| *k == key) {
            return Err(StorageError::Conflict);
        }
        docs.push((key.clone(), body));
        Ok(key)
    }

    async fn get_attempt(&self, key: &str) -> Result<QuizAttemptRecord, StorageError> {
        let body = self
            .snapshot(ATTEMPTS)?
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, body)| body)
            .ok_or(StorageError::NotFound)?;
        document::decode_attempt(key, body)
    }

    async fn list_attempts(&self) -> Result<Vec<AttemptRow>, StorageError> {
        Ok(document::decode_attempts(self.snapshot(ATTEMPTS)?))
    }

    async fn list_attempts_for_user(&self, user: &UserId) -> Result<Vec<AttemptRow>, StorageError> {
        let mut rows = self.list_attempts().await?;
        rows.retain(|row| row.record.user_id() == user);
        Ok(rows)
    }

    async fn list_attempts_for_course(
        &self,
        course: &CourseName,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let mut rows = self.list_attempts().await?;
        rows.retain(|row| row.record.course() == course);
        Ok(rows)
    }
}

#[async_trait]
impl StudyPlanRepository for InMemoryRepository {
    async fn get_plan(&self, user: &UserId) -> Result<Option<StudyPlan>, StorageError> {
        let key = user.as_str();
        self.snapshot(STUDY_PLANS)?
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, body)| document::decode_plan(key, body))
            .transpose()
    }

    async fn put_plan(&self, plan: &StudyPlan) -> Result<(), StorageError> {
        let body = document::encode(plan)?;
        self.insert_raw(STUDY_PLANS, plan.user_id().as_str(), body)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub attempts: Arc<dyn AttemptRepository>,
    pub plans: Arc<dyn StudyPlanRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo.clone());
        let plans: Arc<dyn StudyPlanRepository> = Arc::new(repo);
        Self { attempts, plans }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{CoursePlan, Identity, QuestionOutcome};
    use quiz_core::time::fixed_now;

    fn identity(user: &str) -> Identity {
        Identity::new(UserId::new(user).unwrap(), format!("{user}@example.com"), user)
    }

    fn build_record(user: &str, course: &str, offset_secs: i64) -> QuizAttemptRecord {
        let answers = vec![
            QuestionOutcome {
                question: "Q1".into(),
                options: vec!["a".into(), "b".into()],
                correct_answer: 0,
                user_answer: Some(0),
            },
            QuestionOutcome {
                question: "Q2".into(),
                options: vec!["a".into(), "b".into()],
                correct_answer: 1,
                user_answer: None,
            },
        ];
        QuizAttemptRecord::new(
            &identity(user),
            CourseName::new(course).unwrap(),
            answers,
            fixed_now() + Duration::seconds(offset_secs),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn round_trips_attempt_record() {
        let repo = InMemoryRepository::new();
        let record = build_record("u1", "SQL", 0);

        let key = repo.append_attempt(&record).await.unwrap();
        let fetched = repo.get_attempt(&key).await.unwrap();

        assert_eq!(fetched, record);
    }

    #[tokio::test]
    async fn attempts_are_write_once() {
        let repo = InMemoryRepository::new();
        let record = build_record("u1", "SQL", 0);
        repo.append_attempt(&record).await.unwrap();

        let err = repo.append_attempt(&record).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn queries_filter_by_field() {
        let repo = InMemoryRepository::new();
        repo.append_attempt(&build_record("u1", "SQL", 0)).await.unwrap();
        repo.append_attempt(&build_record("u2", "SQL", 1)).await.unwrap();
        repo.append_attempt(&build_record("u1", "Linux", 2)).await.unwrap();

        let mine = repo
            .list_attempts_for_user(&UserId::new("u1").unwrap())
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);

        let sql = repo
            .list_attempts_for_course(&CourseName::new("SQL").unwrap())
            .await
            .unwrap();
        assert_eq!(sql.len(), 2);
        assert_eq!(repo.list_attempts().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn malformed_documents_are_skipped_on_list() {
        let repo = InMemoryRepository::new();
        repo.append_attempt(&build_record("u1", "SQL", 0)).await.unwrap();
        repo.insert_raw(ATTEMPTS, "junk", serde_json::json!({"score": "high"}))
            .unwrap();

        assert_eq!(repo.list_attempts().await.unwrap().len(), 1);
        assert!(matches!(
            repo.get_attempt("junk").await,
            Err(StorageError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn study_plan_is_overwritten() {
        let repo = InMemoryRepository::new();
        let user = UserId::new("u1").unwrap();
        assert!(repo.get_plan(&user).await.unwrap().is_none());

        let course_plan = |focus: &str| CoursePlan {
            course: CourseName::new("SQL").unwrap(),
            focus_areas: vec![focus.to_string()],
            recommendations: vec![],
            schedule: vec![],
        };
        let first = StudyPlan::new(user.clone(), fixed_now(), vec![course_plan("joins")], vec![])
            .unwrap();
        let second =
            StudyPlan::new(user.clone(), fixed_now(), vec![course_plan("indexes")], vec![])
                .unwrap();

        repo.put_plan(&first).await.unwrap();
        repo.put_plan(&second).await.unwrap();

        let stored = repo.get_plan(&user).await.unwrap().unwrap();
        assert_eq!(stored, second);
    }
}
