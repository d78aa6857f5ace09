//! Dump stored attempts as JSON.

use std::collections::BTreeMap;
use std::path::Path;

use quiz_core::model::QuizAttemptRecord;
use storage::repository::AttemptRepository;

use crate::error::ExportError;

async fn attempts_by_key(
    attempts: &dyn AttemptRepository,
) -> Result<BTreeMap<String, QuizAttemptRecord>, ExportError> {
    let rows = attempts.list_attempts().await?;
    Ok(rows.into_iter().map(|row| (row.key, row.record)).collect())
}

/// Every readable attempt as a pretty JSON object keyed by document key.
///
/// # Errors
///
/// Returns `ExportError` if attempts cannot be read or serialized.
pub async fn export_attempts(attempts: &dyn AttemptRepository) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&attempts_by_key(attempts).await?)?)
}

/// Write the [`export_attempts`] document to `path` and return the number of attempts written.
///
/// # Errors
///
/// Returns `ExportError` on storage, serialization, or I/O failure.
pub async fn export_attempts_to_file(
    attempts: &dyn AttemptRepository,
    path: &Path,
) -> Result<usize, ExportError> {
    let by_key = attempts_by_key(attempts).await?;
    tokio::fs::write(path, serde_json::to_string_pretty(&by_key)?).await?;
    tracing::info!(path = %path.display(), count = by_key.len(), "exported attempts");
    Ok(by_key.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{CourseName, Identity, QuestionOutcome, UserId};
    use quiz_core::time::fixed_now;
    use storage::InMemoryRepository;

    fn seeded_record() -> QuizAttemptRecord {
        let identity = Identity::new(UserId::new("u1").unwrap(), "u1@example.com", "Uma");
        QuizAttemptRecord::new(
            &identity,
            CourseName::new("SQL").unwrap(),
            vec![QuestionOutcome {
                question: "Q".into(),
                options: vec!["a".into(), "b".into()],
                correct_answer: 1,
                user_answer: Some(1),
            }],
            fixed_now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn export_is_keyed_by_document_key() {
        let repo = InMemoryRepository::new();
        let key = repo.append_attempt(&seeded_record()).await.unwrap();

        let json = export_attempts(&repo).await.unwrap();
        let parsed: BTreeMap<String, serde_json::Value> = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[&key]["course"], "SQL");
        assert_eq!(parsed[&key]["score"], 1);
    }

    #[tokio::test]
    async fn export_to_file_writes_every_attempt() {
        let repo = InMemoryRepository::new();
        let key = repo.append_attempt(&seeded_record()).await.unwrap();
        let file_name = format!("quizdeck-export-{}.json", std::process::id());
        let path = std::env::temp_dir().join(file_name);

        let count = export_attempts_to_file(&repo, &path).await.unwrap();
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(count, 1);
        let parsed: BTreeMap<String, serde_json::Value> = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed[&key]["userId"], "u1");
    }
}
