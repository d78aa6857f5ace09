//! Boundary between the schemaless document store and typed records.
//!
//! Documents are JSON bodies addressed by `(collection, key)`. Every read goes
//! through the decoders here so malformed documents never reach callers.

use quiz_core::model::{QuizAttemptRecord, StudyPlan};
use serde::Serialize;
use serde_json::Value;

use crate::repository::{AttemptRow, StorageError};

/// Collection holding one document per completed quiz attempt.
pub const ATTEMPTS: &str = "quizResults";
/// Collection holding one study plan per user, keyed by user id.
pub const STUDY_PLANS: &str = "studyPlans";

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Value, StorageError> {
    serde_json::to_value(value).map_err(ser)
}

/// Decode one attempt document.
///
/// # Errors
///
/// Returns `StorageError::Serialization` naming the key when the body does not
/// describe a valid attempt.
pub fn decode_attempt(key: &str, body: Value) -> Result<QuizAttemptRecord, StorageError> {
    serde_json::from_value(body)
        .map_err(|e| StorageError::Serialization(format!("attempt {key}: {e}")))
}

/// Decode a batch of attempt documents, skipping the malformed ones.
pub fn decode_attempts<I>(docs: I) -> Vec<AttemptRow>
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut rows = Vec::new();
    let mut skipped = 0_usize;
    for (key, body) in docs {
        match decode_attempt(&key, body) {
            Ok(record) => rows.push(AttemptRow { key, record }),
            Err(err) => {
                skipped += 1;
                tracing::warn!(%err, "skipping malformed attempt document");
            }
        }
    }
    if skipped > 0 {
        tracing::warn!(skipped, kept = rows.len(), "attempt documents rejected at read");
    }
    rows
}

/// Decode a study plan document.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the body is not a valid plan.
pub fn decode_plan(key: &str, body: Value) -> Result<StudyPlan, StorageError> {
    let plan: StudyPlan = serde_json::from_value(body)
        .map_err(|e| StorageError::Serialization(format!("study plan {key}: {e}")))?;
    plan.validate()
        .map_err(|e| StorageError::Serialization(format!("study plan {key}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_attempts_skips_garbage() {
        let good = json!({
            "userId": "u1",
            "userEmail": "u1@example.com",
            "userName": "Uma",
            "course": "SQL",
            "score": 1,
            "totalQuestions": 2,
            "timestamp": "2024-03-01T10:00:00Z"
        });
        let docs = vec![
            ("u1_1".to_string(), good),
            ("u1_2".to_string(), json!({"userId": "u1"})),
            ("u1_3".to_string(), json!("not an object")),
        ];

        let rows = decode_attempts(docs);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "u1_1");
        assert_eq!(rows[0].record.course().as_str(), "SQL");
    }

    #[test]
    fn decode_plan_rejects_empty_plan() {
        let body = json!({
            "userId": "u1",
            "generatedAt": "2024-03-01T10:00:00Z",
            "courses": []
        });
        assert!(matches!(
            decode_plan("u1", body),
            Err(StorageError::Serialization(_))
        ));
    }
}
