//! Question bank adapter.
//!
//! The remote API returns answers as a map of slot labels to optional texts
//! and names the correct slot by label. Mapping into [`Question`] drops the
//! empty slots and re-indexes the correct answer among the kept options.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use quiz_core::model::{CourseName, Question, QuestionId};

use crate::config::QuizApiConfig;
use crate::error::QuizError;

/// Source of quiz questions for a course.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Fetch up to `limit` questions for `course`.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::FetchFailed` when the request fails or the payload
    /// cannot be read.
    async fn fetch(&self, course: &CourseName, limit: u32) -> Result<Vec<Question>, QuizError>;
}

/// One question as served by the quiz API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestion {
    #[serde(default)]
    pub id: u64,
    pub question: String,
    #[serde(default)]
    pub answers: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub correct_answer: Option<String>,
}

impl RawQuestion {
    /// Convert into a validated [`Question`].
    ///
    /// Null answer slots are dropped. A correct label that is absent or names
    /// a dropped slot maps to option `0`.
    ///
    /// # Errors
    ///
    /// Returns the validation error when the remaining options do not form a
    /// valid question (for example fewer than two options).
    pub fn into_question(self) -> Result<Question, quiz_core::model::QuestionError> {
        let mut options = Vec::with_capacity(self.answers.len());
        let mut correct = None;
        for (label, text) in self.answers {
            let Some(text) = text else { continue };
            if self.correct_answer.as_deref() == Some(label.as_str()) {
                correct = Some(options.len());
            }
            options.push(text);
        }

        let correct = correct.unwrap_or_else(|| {
            tracing::warn!(
                question_id = self.id,
                label = ?self.correct_answer,
                "correct answer label does not match any option; using the first option"
            );
            0
        });

        Question::new(QuestionId::new(self.id), self.question, options, correct)
    }
}

/// Map a raw batch, skipping questions that fail validation.
#[must_use]
pub fn map_questions(raw: Vec<RawQuestion>) -> Vec<Question> {
    let fetched = raw.len();
    let questions: Vec<Question> = raw
        .into_iter()
        .filter_map(|q| {
            let id = q.id;
            match q.into_question() {
                Ok(question) => Some(question),
                Err(err) => {
                    tracing::warn!(question_id = id, %err, "skipping invalid question");
                    None
                }
            }
        })
        .collect();
    tracing::debug!(fetched, kept = questions.len(), "mapped question batch");
    questions
}

/// HTTP client for a quizapi.io-compatible endpoint.
#[derive(Clone)]
pub struct QuizApiClient {
    client: Client,
    config: QuizApiConfig,
}

impl QuizApiClient {
    #[must_use]
    pub fn new(client: Client, config: QuizApiConfig) -> Self {
        Self { client, config }
    }

    #[must_use]
    pub fn config(&self) -> &QuizApiConfig {
        &self.config
    }
}

#[async_trait]
impl QuestionBank for QuizApiClient {
    async fn fetch(&self, course: &CourseName, limit: u32) -> Result<Vec<Question>, QuizError> {
        let limit = limit.to_string();
        let mut request = self
            .client
            .get(&self.config.base_url)
            .query(&[("category", course.as_str()), ("limit", limit.as_str())]);
        if let Some(key) = &self.config.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| QuizError::FetchFailed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(QuizError::FetchFailed(format!(
                "question bank returned status {status}"
            )));
        }

        let raw: Vec<RawQuestion> = response
            .json()
            .await
            .map_err(|e| QuizError::FetchFailed(e.to_string()))?;
        let questions = map_questions(raw);
        tracing::info!(course = %course, count = questions.len(), "fetched quiz questions");
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawQuestion {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn null_slots_are_dropped_and_label_reindexed() {
        let q = raw(json!({
            "id": 7,
            "question": "Which command lists files?",
            "answers": {
                "answer_a": "cd",
                "answer_b": null,
                "answer_c": "ls",
                "answer_d": "pwd",
                "answer_e": null,
                "answer_f": null
            },
            "correct_answer": "answer_c"
        }))
        .into_question()
        .unwrap();

        assert_eq!(q.options(), ["cd", "ls", "pwd"]);
        assert_eq!(q.correct_option(), 1);
        assert_eq!(q.id().value(), 7);
    }

    #[test]
    fn unmatched_label_falls_back_to_first_option() {
        let q = raw(json!({
            "id": 1,
            "question": "Q",
            "answers": {"answer_a": "x", "answer_b": "y", "answer_c": null},
            "correct_answer": "answer_c"
        }))
        .into_question()
        .unwrap();
        assert_eq!(q.correct_option(), 0);

        let q = raw(json!({
            "id": 2,
            "question": "Q",
            "answers": {"answer_a": "x", "answer_b": "y"},
            "correct_answer": null
        }))
        .into_question()
        .unwrap();
        assert_eq!(q.correct_option(), 0);
    }

    #[test]
    fn invalid_questions_are_skipped() {
        let batch = vec![
            raw(json!({
                "id": 1,
                "question": "only one option",
                "answers": {"answer_a": "x", "answer_b": null},
                "correct_answer": "answer_a"
            })),
            raw(json!({
                "id": 2,
                "question": "too many",
                "answers": {
                    "answer_a": "a", "answer_b": "b", "answer_c": "c",
                    "answer_d": "d", "answer_e": "e"
                },
                "correct_answer": "answer_a"
            })),
            raw(json!({
                "id": 3,
                "question": "fine",
                "answers": {"answer_a": "a", "answer_b": "b"},
                "correct_answer": "answer_b"
            })),
        ];

        let questions = map_questions(batch);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id().value(), 3);
    }
}
