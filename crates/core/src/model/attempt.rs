use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::course::CourseName;
use crate::model::identity::Identity;
use crate::model::ids::UserId;
use crate::model::question::Question;
use crate::scoring;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RecordError {
    #[error("score ({score}) exceeds total questions ({total})")]
    ScoreExceedsTotal { score: u32, total: u32 },

    #[error("total questions ({total}) does not match answer count ({answers})")]
    AnswerCountMismatch { total: u32, answers: usize },

    #[error("score ({score}) does not match the recorded answers ({computed})")]
    ScoreMismatch { score: u32, computed: u32 },

    #[error("attempt has no questions")]
    Empty,

    #[error("too many questions for a single attempt: {len}")]
    TooManyQuestions { len: usize },
}

/// Per-question detail stored with an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutcome {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub user_answer: Option<usize>,
}

impl QuestionOutcome {
    #[must_use]
    pub fn from_question(question: &Question, user_answer: Option<usize>) -> Self {
        Self {
            question: question.text().to_owned(),
            options: question.options().to_vec(),
            correct_answer: question.correct_option(),
            user_answer,
        }
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.user_answer == Some(self.correct_answer)
    }
}

/// One persisted outcome of a completed quiz session.
///
/// Append-only: there are no setters, and the persisted shape is validated on
/// the way back in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AttemptDocument", into = "AttemptDocument")]
pub struct QuizAttemptRecord {
    user_id: UserId,
    user_email: String,
    user_name: String,
    course: CourseName,
    score: u32,
    total_questions: u32,
    answers: Vec<QuestionOutcome>,
    timestamp: DateTime<Utc>,
}

impl QuizAttemptRecord {
    /// Build a record for a finished quiz, computing score and total from the answers.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Empty` for an attempt without questions and
    /// `RecordError::TooManyQuestions` if the count cannot fit in `u32`.
    pub fn new(
        identity: &Identity,
        course: CourseName,
        answers: Vec<QuestionOutcome>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, RecordError> {
        if answers.is_empty() {
            return Err(RecordError::Empty);
        }
        let total_questions = u32::try_from(answers.len())
            .map_err(|_| RecordError::TooManyQuestions { len: answers.len() })?;
        let score = scoring::score_outcomes(&answers);

        Ok(Self {
            user_id: identity.user_id.clone(),
            user_email: identity.email.clone(),
            user_name: identity.name.clone(),
            course,
            score,
            total_questions,
            answers,
            timestamp,
        })
    }

    /// Rehydrate a record from storage.
    ///
    /// # Errors
    ///
    /// Returns `RecordError` if score, total and answers disagree.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        user_id: UserId,
        user_email: String,
        user_name: String,
        course: CourseName,
        score: u32,
        total_questions: u32,
        answers: Vec<QuestionOutcome>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, RecordError> {
        if score > total_questions {
            return Err(RecordError::ScoreExceedsTotal {
                score,
                total: total_questions,
            });
        }
        // Older documents carry no per-question detail; only check when present.
        if !answers.is_empty() {
            if usize::try_from(total_questions).ok() != Some(answers.len()) {
                return Err(RecordError::AnswerCountMismatch {
                    total: total_questions,
                    answers: answers.len(),
                });
            }
            let computed = scoring::score_outcomes(&answers);
            if computed != score {
                return Err(RecordError::ScoreMismatch { score, computed });
            }
        }

        Ok(Self {
            user_id,
            user_email,
            user_name,
            course,
            score,
            total_questions,
            answers,
            timestamp,
        })
    }

    /// Document key used by the record store: `{user_id}_{unix_millis}`.
    #[must_use]
    pub fn document_key(&self) -> String {
        format!("{}_{}", self.user_id, self.timestamp.timestamp_millis())
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn user_email(&self) -> &str {
        &self.user_email
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    #[must_use]
    pub fn course(&self) -> &CourseName {
        &self.course
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn answers(&self) -> &[QuestionOutcome] {
        &self.answers
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        scoring::percentage(self.score, self.total_questions)
    }
}

/// Wire shape of an attempt document (camelCase, as stored by the web client).
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttemptDocument {
    user_id: UserId,
    #[serde(default)]
    user_email: String,
    #[serde(default)]
    user_name: String,
    course: CourseName,
    score: u32,
    total_questions: u32,
    #[serde(default)]
    answers: Vec<QuestionOutcome>,
    timestamp: DateTime<Utc>,
}

impl TryFrom<AttemptDocument> for QuizAttemptRecord {
    type Error = RecordError;

    fn try_from(doc: AttemptDocument) -> Result<Self, Self::Error> {
        QuizAttemptRecord::from_persisted(
            doc.user_id,
            doc.user_email,
            doc.user_name,
            doc.course,
            doc.score,
            doc.total_questions,
            doc.answers,
            doc.timestamp,
        )
    }
}

impl From<QuizAttemptRecord> for AttemptDocument {
    fn from(r: QuizAttemptRecord) -> Self {
        Self {
            user_id: r.user_id,
            user_email: r.user_email,
            user_name: r.user_name,
            course: r.course,
            score: r.score,
            total_questions: r.total_questions,
            answers: r.answers,
            timestamp: r.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn identity() -> Identity {
        Identity::new(UserId::new("u1").unwrap(), "u1@example.com", "Uma")
    }

    fn outcome(correct: usize, user: Option<usize>) -> QuestionOutcome {
        QuestionOutcome {
            question: "Q".into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: correct,
            user_answer: user,
        }
    }

    #[test]
    fn new_record_scores_answers() {
        let record = QuizAttemptRecord::new(
            &identity(),
            CourseName::new("SQL").unwrap(),
            vec![outcome(0, Some(0)), outcome(1, None), outcome(2, Some(1))],
            fixed_now(),
        )
        .unwrap();

        assert_eq!(record.score(), 1);
        assert_eq!(record.total_questions(), 3);
        assert_eq!(record.percentage(), 33);
        assert_eq!(
            record.document_key(),
            format!("u1_{}", fixed_now().timestamp_millis())
        );
    }

    #[test]
    fn empty_attempt_is_rejected() {
        let err = QuizAttemptRecord::new(
            &identity(),
            CourseName::new("SQL").unwrap(),
            Vec::new(),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, RecordError::Empty);
    }

    #[test]
    fn json_round_trip_is_field_for_field_equal() {
        let record = QuizAttemptRecord::new(
            &identity(),
            CourseName::new("Docker").unwrap(),
            vec![outcome(3, Some(3)), outcome(0, Some(2))],
            fixed_now(),
        )
        .unwrap();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["totalQuestions"], 2);

        let back: QuizAttemptRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn malformed_document_is_rejected() {
        let doc = serde_json::json!({
            "userId": "u1",
            "course": "SQL",
            "score": 9,
            "totalQuestions": 5,
            "timestamp": "2024-01-01T00:00:00Z"
        });
        assert!(serde_json::from_value::<QuizAttemptRecord>(doc).is_err());

        let missing_course = serde_json::json!({
            "userId": "u1",
            "score": 1,
            "totalQuestions": 5,
            "timestamp": "2024-01-01T00:00:00Z"
        });
        assert!(serde_json::from_value::<QuizAttemptRecord>(missing_course).is_err());
    }

    #[test]
    fn legacy_document_without_answers_is_accepted() {
        let doc = serde_json::json!({
            "userId": "u2",
            "course": "Linux",
            "score": 4,
            "totalQuestions": 5,
            "timestamp": "2024-01-01T00:00:00Z"
        });
        let record: QuizAttemptRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(record.score(), 4);
        assert!(record.answers().is_empty());
        assert_eq!(record.user_name(), "");
    }
}
