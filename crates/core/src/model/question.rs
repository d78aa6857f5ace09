use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Fewest options a multiple-choice question may carry.
pub const MIN_OPTIONS: usize = 2;
/// Most options a multiple-choice question may carry.
pub const MAX_OPTIONS: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question must have between {MIN_OPTIONS} and {MAX_OPTIONS} options, got {count}")]
    OptionCount { count: usize },

    #[error("option {index} is empty")]
    EmptyOption { index: usize },

    #[error("correct option {index} is out of range for {count} options")]
    CorrectOptionOutOfRange { index: usize, count: usize },
}

/// A single multiple-choice question ready to be shown in a quiz.
///
/// `correct_option` is always a valid index into `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionDraft", into = "QuestionDraft")]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_option: usize,
}

impl Question {
    /// # Errors
    ///
    /// Returns `QuestionError` if the text is blank, the option count is outside
    /// `MIN_OPTIONS..=MAX_OPTIONS`, an option is blank, or `correct_option` is
    /// not a valid index.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<String>,
        correct_option: usize,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        let count = options.len();
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&count) {
            return Err(QuestionError::OptionCount { count });
        }
        if let Some(index) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::EmptyOption { index });
        }
        if correct_option >= count {
            return Err(QuestionError::CorrectOptionOutOfRange {
                index: correct_option,
                count,
            });
        }

        Ok(Self {
            id,
            text,
            options,
            correct_option,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_option(&self) -> usize {
        self.correct_option
    }

    /// Text of the correct option.
    #[must_use]
    pub fn correct_text(&self) -> &str {
        &self.options[self.correct_option]
    }

    #[must_use]
    pub fn is_correct(&self, answer: Option<usize>) -> bool {
        answer == Some(self.correct_option)
    }
}

/// Letter label for an option index (`0 -> 'A'`).
#[must_use]
pub fn option_label(index: usize) -> char {
    u8::try_from(index)
        .ok()
        .and_then(|i| b'A'.checked_add(i))
        .map_or('?', char::from)
}

#[derive(Serialize, Deserialize)]
struct QuestionDraft {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_option: usize,
}

impl TryFrom<QuestionDraft> for Question {
    type Error = QuestionError;

    fn try_from(draft: QuestionDraft) -> Result<Self, Self::Error> {
        Question::new(draft.id, draft.text, draft.options, draft.correct_option)
    }
}

impl From<Question> for QuestionDraft {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            text: q.text,
            options: q.options,
            correct_option: q.correct_option,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn valid_question_builds() {
        let q = Question::new(QuestionId::new(1), "What is 2+2?", opts(&["3", "4"]), 1).unwrap();
        assert_eq!(q.correct_text(), "4");
        assert!(q.is_correct(Some(1)));
        assert!(!q.is_correct(None));
    }

    #[test]
    fn rejects_out_of_range_correct_option() {
        let err = Question::new(QuestionId::new(1), "Q", opts(&["a", "b"]), 2).unwrap_err();
        assert_eq!(
            err,
            QuestionError::CorrectOptionOutOfRange { index: 2, count: 2 }
        );
    }

    #[test]
    fn rejects_bad_option_counts() {
        assert_eq!(
            Question::new(QuestionId::new(1), "Q", opts(&["a"]), 0).unwrap_err(),
            QuestionError::OptionCount { count: 1 }
        );
        assert_eq!(
            Question::new(QuestionId::new(1), "Q", opts(&["a", "b", "c", "d", "e"]), 0)
                .unwrap_err(),
            QuestionError::OptionCount { count: 5 }
        );
    }

    #[test]
    fn deserialization_runs_validation() {
        let bad = r#"{"id":1,"text":"Q","options":["a","b"],"correct_option":7}"#;
        assert!(serde_json::from_str::<Question>(bad).is_err());
    }

    #[test]
    fn option_labels_are_letters() {
        assert_eq!(option_label(0), 'A');
        assert_eq!(option_label(3), 'D');
    }
}
