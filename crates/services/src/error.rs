//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{CourseName, RecordError, StudyPlanError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Misuse of the quiz session state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("course {0} is not in the confirmed course list")]
    NoCourseSelected(CourseName),
    #[error("option {index} is out of range for a question with {count} options")]
    InvalidOption { index: usize, count: usize },
    #[error("cannot {action} while the session is {status}")]
    InvalidTransition {
        action: &'static str,
        status: &'static str,
    },
    #[error("session already completed")]
    Completed,
}

/// Failures at the edges of a quiz: fetching questions, persisting the
/// attempt and generating the study plan.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("failed to fetch questions: {0}")]
    FetchFailed(String),
    #[error("failed to persist quiz attempt: {0}")]
    PersistFailed(String),
    #[error("failed to generate study plan: {0}")]
    PlanGenerationFailed(String),
    #[error("a signed-in user is required")]
    AuthRequired,
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<StudyPlanError> for QuizError {
    fn from(err: StudyPlanError) -> Self {
        Self::PlanGenerationFailed(err.to_string())
    }
}

/// Invalid environment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors emitted by the export helpers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
