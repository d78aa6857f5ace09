use std::fmt;

use quiz_core::model::{ConfirmedCourses, CourseName, Question, QuestionOutcome};
use quiz_core::scoring;

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of one quiz attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    NotStarted,
    Loading,
    FetchFailed { reason: String },
    InProgress,
    Submitting,
    Completed,
}

impl SessionStatus {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::Loading => "loading",
            Self::FetchFailed { .. } => "fetch failed",
            Self::InProgress => "in progress",
            Self::Submitting => "submitting",
            Self::Completed => "completed",
        }
    }
}

/// Score of a finished session, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOutcome {
    pub course: CourseName,
    pub score: u32,
    pub total: u32,
    pub percentage: u8,
    pub outcomes: Vec<QuestionOutcome>,
}

/// Result of `next()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Nothing was selected; the session did not move.
    Ignored,
    /// Moved to the next question.
    Moved,
    /// The last question was committed and the session is submitting.
    Finished(QuizOutcome),
}

/// Result of one elapsed second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    Running(u32),
    /// Time ran out and the session moved to the next question.
    Advanced,
    /// Time ran out on the last question.
    Finished(QuizOutcome),
}

/// One row of the answer review shown after a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerReview<'a> {
    pub question: &'a Question,
    pub user_answer: Option<usize>,
    pub is_correct: bool,
}

impl AnswerReview<'_> {
    #[must_use]
    pub fn correct_text(&self) -> &str {
        self.question.correct_text()
    }

    #[must_use]
    pub fn user_text(&self) -> Option<&str> {
        self.user_answer
            .and_then(|i| self.question.options().get(i))
            .map(String::as_str)
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state machine for a single quiz attempt.
///
/// Only `next()` and timeouts commit an answer; `select_option()` just moves
/// the selection. Entering a question restores whatever was recorded for it.
pub struct QuizSession {
    course: CourseName,
    seconds_per_question: u32,
    status: SessionStatus,
    questions: Vec<Question>,
    answers: Vec<Option<usize>>,
    current: usize,
    selection: Option<usize>,
    remaining: u32,
}

impl QuizSession {
    #[must_use]
    pub fn new(course: CourseName, seconds_per_question: u32) -> Self {
        let seconds_per_question = seconds_per_question.max(1);
        Self {
            course,
            seconds_per_question,
            status: SessionStatus::NotStarted,
            questions: Vec::new(),
            answers: Vec::new(),
            current: 0,
            selection: None,
            remaining: seconds_per_question,
        }
    }

    #[must_use]
    pub fn course(&self) -> &CourseName {
        &self.course
    }

    #[must_use]
    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    #[must_use]
    pub fn seconds_per_question(&self) -> u32 {
        self.seconds_per_question
    }

    #[must_use]
    pub fn time_remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn selection(&self) -> Option<usize> {
        self.selection
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.status {
            SessionStatus::InProgress => self.questions.get(self.current),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.questions.len();
        let current = if total == 0 { 0 } else { self.current + 1 };
        let answered = self.answers.iter().filter(|a| a.is_some()).count();
        let percent = scoring::percentage(
            u32::try_from(current).unwrap_or(u32::MAX),
            u32::try_from(total).unwrap_or(u32::MAX),
        );
        SessionProgress {
            current,
            total,
            answered,
            percent,
        }
    }

    /// Start loading questions for the session's course.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoCourseSelected` when the course is not in
    /// `confirmed`, or a transition error when the session was already started.
    pub fn begin(&mut self, confirmed: &ConfirmedCourses) -> Result<(), SessionError> {
        self.expect_status(&SessionStatus::NotStarted, "begin")?;
        if !confirmed.contains(&self.course) {
            return Err(SessionError::NoCourseSelected(self.course.clone()));
        }
        self.status = SessionStatus::Loading;
        Ok(())
    }

    /// Install a fetched batch. An empty batch fails the fetch.
    ///
    /// # Errors
    ///
    /// Returns a transition error unless the session is loading.
    pub fn questions_loaded(&mut self, questions: Vec<Question>) -> Result<(), SessionError> {
        self.expect_status(&SessionStatus::Loading, "load questions")?;
        if questions.is_empty() {
            self.status = SessionStatus::FetchFailed {
                reason: format!("no questions available for {}", self.course),
            };
            return Ok(());
        }
        self.answers = vec![None; questions.len()];
        self.questions = questions;
        self.current = 0;
        self.selection = None;
        self.remaining = self.seconds_per_question;
        self.status = SessionStatus::InProgress;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns a transition error unless the session is loading.
    pub fn fetch_failed(&mut self, reason: impl Into<String>) -> Result<(), SessionError> {
        self.expect_status(&SessionStatus::Loading, "fail fetch")?;
        self.status = SessionStatus::FetchFailed {
            reason: reason.into(),
        };
        Ok(())
    }

    /// # Errors
    ///
    /// Returns a transition error unless the last fetch failed.
    pub fn retry(&mut self) -> Result<(), SessionError> {
        self.ensure_not_completed()?;
        if !matches!(self.status, SessionStatus::FetchFailed { .. }) {
            return Err(self.invalid("retry"));
        }
        self.status = SessionStatus::Loading;
        Ok(())
    }

    /// Move the selection for the current question. Nothing is committed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidOption` for an index outside the current
    /// question's options.
    pub fn select_option(&mut self, index: usize) -> Result<(), SessionError> {
        self.expect_status(&SessionStatus::InProgress, "select an option")?;
        let count = self
            .questions
            .get(self.current)
            .map_or(0, |q| q.options().len());
        if index >= count {
            return Err(SessionError::InvalidOption { index, count });
        }
        self.selection = Some(index);
        Ok(())
    }

    /// Commit the selection and move forward. Ignored without a selection.
    ///
    /// # Errors
    ///
    /// Returns a transition error unless the session is in progress.
    pub fn next(&mut self) -> Result<Advance, SessionError> {
        self.expect_status(&SessionStatus::InProgress, "advance")?;
        if self.selection.is_none() {
            return Ok(Advance::Ignored);
        }
        Ok(match self.advance() {
            Some(outcome) => Advance::Finished(outcome),
            None => Advance::Moved,
        })
    }

    /// Step back one question, keeping the current selection recorded.
    ///
    /// Returns `false` on the first question.
    ///
    /// # Errors
    ///
    /// Returns a transition error unless the session is in progress.
    pub fn previous(&mut self) -> Result<bool, SessionError> {
        self.expect_status(&SessionStatus::InProgress, "go back")?;
        if self.current == 0 {
            return Ok(false);
        }
        self.answers[self.current] = self.selection;
        self.enter(self.current - 1);
        Ok(true)
    }

    /// One second elapsed on the current question.
    ///
    /// At zero the selection (possibly unset) is committed and the session
    /// advances.
    ///
    /// # Errors
    ///
    /// Returns a transition error unless the session is in progress.
    pub fn tick(&mut self) -> Result<Tick, SessionError> {
        self.expect_status(&SessionStatus::InProgress, "tick")?;
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return Ok(Tick::Running(self.remaining));
        }
        tracing::debug!(question = self.current, "question timed out");
        Ok(match self.advance() {
            Some(outcome) => Tick::Finished(outcome),
            None => Tick::Advanced,
        })
    }

    /// # Errors
    ///
    /// Returns a transition error unless the session is submitting.
    pub fn mark_completed(&mut self) -> Result<(), SessionError> {
        self.expect_status(&SessionStatus::Submitting, "complete")?;
        self.status = SessionStatus::Completed;
        Ok(())
    }

    /// Score of the committed answers. Available once submitting.
    #[must_use]
    pub fn outcome(&self) -> Option<QuizOutcome> {
        match self.status {
            SessionStatus::Submitting | SessionStatus::Completed => Some(self.build_outcome()),
            _ => None,
        }
    }

    #[must_use]
    pub fn answer_review(&self) -> Vec<AnswerReview<'_>> {
        self.questions
            .iter()
            .enumerate()
            .map(|(i, question)| {
                let user_answer = self.answers.get(i).copied().flatten();
                AnswerReview {
                    question,
                    user_answer,
                    is_correct: question.is_correct(user_answer),
                }
            })
            .collect()
    }

    fn advance(&mut self) -> Option<QuizOutcome> {
        self.answers[self.current] = self.selection;
        if self.current + 1 < self.questions.len() {
            self.enter(self.current + 1);
            return None;
        }
        self.selection = None;
        self.status = SessionStatus::Submitting;
        Some(self.build_outcome())
    }

    fn enter(&mut self, index: usize) {
        self.current = index;
        self.selection = self.answers[index];
        self.remaining = self.seconds_per_question;
    }

    fn build_outcome(&self) -> QuizOutcome {
        let score = scoring::score(&self.questions, &self.answers);
        let total = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        QuizOutcome {
            course: self.course.clone(),
            score,
            total,
            percentage: scoring::percentage(score, total),
            outcomes: self
                .questions
                .iter()
                .zip(&self.answers)
                .map(|(q, a)| QuestionOutcome::from_question(q, *a))
                .collect(),
        }
    }

    fn ensure_not_completed(&self) -> Result<(), SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        Ok(())
    }

    fn expect_status(
        &self,
        expected: &SessionStatus,
        action: &'static str,
    ) -> Result<(), SessionError> {
        self.ensure_not_completed()?;
        if &self.status != expected {
            return Err(self.invalid(action));
        }
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            status: self.status.name(),
        }
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("course", &self.course)
            .field("status", &self.status)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("selection", &self.selection)
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
