use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use quiz_core::model::{ConfirmedCourses, CourseName, Identity, QuizAttemptRecord, StudyPlan};
use storage::repository::{AttemptRepository, StudyPlanRepository};

use super::session::{QuizOutcome, QuizSession, SessionStatus};
use crate::Clock;
use crate::context::SessionContext;
use crate::error::{QuizError, SessionError};
use crate::question_bank::QuestionBank;
use crate::study_plan::{StudyPlanGenerator, StudyPlanRequest};

/// Orchestrates fetching questions and submitting finished quizzes.
#[derive(Clone)]
pub struct QuizWorkflow {
    clock: Clock,
    questions: Arc<dyn QuestionBank>,
    attempts: Arc<dyn AttemptRepository>,
    plans: Arc<dyn StudyPlanRepository>,
    generator: Arc<dyn StudyPlanGenerator>,
    question_limit: u32,
    seconds_per_question: u32,
    call_timeout: Duration,
}

impl QuizWorkflow {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionBank>,
        attempts: Arc<dyn AttemptRepository>,
        plans: Arc<dyn StudyPlanRepository>,
        generator: Arc<dyn StudyPlanGenerator>,
    ) -> Self {
        Self {
            clock,
            questions,
            attempts,
            plans,
            generator,
            question_limit: crate::config::DEFAULT_QUESTION_LIMIT,
            seconds_per_question: crate::config::DEFAULT_SECONDS_PER_QUESTION,
            call_timeout: Duration::from_secs(crate::config::DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_question_limit(mut self, limit: u32) -> Self {
        self.question_limit = limit;
        self
    }

    #[must_use]
    pub fn with_seconds_per_question(mut self, seconds: u32) -> Self {
        self.seconds_per_question = seconds;
        self
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Create a session for `course` and fetch its questions.
    ///
    /// A failed or timed-out fetch leaves the session in `FetchFailed`; use
    /// [`QuizWorkflow::retry_fetch`] to try again.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoCourseSelected` when `course` is not confirmed.
    pub async fn start(
        &self,
        course: CourseName,
        confirmed: &ConfirmedCourses,
    ) -> Result<QuizSession, SessionError> {
        let mut session = QuizSession::new(course, self.seconds_per_question);
        session.begin(confirmed)?;
        self.load(&mut session).await?;
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns a transition error unless the previous fetch failed.
    pub async fn retry_fetch(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        session.retry()?;
        self.load(session).await
    }

    async fn load(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        let fetched = bounded(
            self.call_timeout,
            "question fetch",
            self.questions.fetch(session.course(), self.question_limit),
        )
        .await;
        match fetched {
            Ok(questions) => session.questions_loaded(questions)?,
            Err(err) => {
                tracing::warn!(course = %session.course(), %err, "question fetch failed");
                session.fetch_failed(err.to_string())?;
            }
        }
        if let SessionStatus::FetchFailed { reason } = session.status() {
            tracing::info!(course = %session.course(), reason = %reason, "quiz cannot start");
        }
        Ok(())
    }

    /// Complete a finished session and submit it in the background.
    ///
    /// The outcome is returned at once. The handle resolves once the attempt
    /// is persisted and a study plan has been generated and stored, or once
    /// one of those steps failed.
    ///
    /// # Errors
    ///
    /// Returns a transition error unless the session is submitting.
    pub fn submit(
        &self,
        ctx: &SessionContext,
        session: &mut QuizSession,
    ) -> Result<(QuizOutcome, SubmissionHandle), SessionError> {
        session.mark_completed()?;
        let outcome = session.outcome().ok_or(SessionError::Completed)?;

        let job = SubmissionJob {
            identity: ctx.identity().cloned(),
            outcome: outcome.clone(),
            submitted_at: self.clock.now(),
            attempts: Arc::clone(&self.attempts),
            plans: Arc::clone(&self.plans),
            generator: Arc::clone(&self.generator),
            call_timeout: self.call_timeout,
        };
        let handle = SubmissionHandle {
            task: tokio::spawn(job.run()),
        };
        Ok((outcome, handle))
    }
}

//
// ─── SUBMISSION ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Pending,
    Done,
}

/// What the background submission managed to do.
#[derive(Debug, Default)]
pub struct SubmissionReport {
    pub attempt_key: Option<String>,
    pub persisted: bool,
    pub plan: Option<StudyPlan>,
    pub errors: Vec<QuizError>,
}

impl SubmissionReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Observable handle to a background submission.
#[derive(Debug)]
pub struct SubmissionHandle {
    task: JoinHandle<SubmissionReport>,
}

impl SubmissionHandle {
    #[must_use]
    pub fn status(&self) -> SubmissionStatus {
        if self.task.is_finished() {
            SubmissionStatus::Done
        } else {
            SubmissionStatus::Pending
        }
    }

    /// Wait for the submission to finish.
    pub async fn wait(self) -> SubmissionReport {
        match self.task.await {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(%err, "submission task did not finish");
                SubmissionReport {
                    errors: vec![QuizError::PersistFailed(err.to_string())],
                    ..SubmissionReport::default()
                }
            }
        }
    }
}

struct SubmissionJob {
    identity: Option<Identity>,
    outcome: QuizOutcome,
    submitted_at: DateTime<Utc>,
    attempts: Arc<dyn AttemptRepository>,
    plans: Arc<dyn StudyPlanRepository>,
    generator: Arc<dyn StudyPlanGenerator>,
    call_timeout: Duration,
}

impl SubmissionJob {
    async fn run(self) -> SubmissionReport {
        let mut report = SubmissionReport::default();

        let Some(identity) = self.identity.as_ref() else {
            tracing::warn!(course = %self.outcome.course, "submission without a signed-in user");
            report.errors.push(QuizError::AuthRequired);
            return report;
        };

        let record = match QuizAttemptRecord::new(
            identity,
            self.outcome.course.clone(),
            self.outcome.outcomes.clone(),
            self.submitted_at,
        ) {
            Ok(record) => record,
            Err(err) => {
                report.errors.push(err.into());
                return report;
            }
        };

        let persisted = bounded(self.call_timeout, "persist attempt", async {
            self.attempts
                .append_attempt(&record)
                .await
                .map_err(|e| QuizError::PersistFailed(e.to_string()))
        })
        .await;
        match persisted {
            Ok(key) => {
                tracing::info!(key = %key, score = record.score(), "quiz attempt persisted");
                report.attempt_key = Some(key);
                report.persisted = true;
            }
            Err(err) => {
                tracing::error!(user = %identity.user_id, %err, "failed to persist quiz attempt");
                report.errors.push(err);
                return report;
            }
        }

        let history = bounded(self.call_timeout, "load attempt history", async {
            self.attempts
                .list_attempts_for_user(&identity.user_id)
                .await
                .map_err(QuizError::from)
        })
        .await
        .map(|rows| rows.into_iter().map(|row| row.record).collect::<Vec<_>>())
        .unwrap_or_else(|err| {
            tracing::warn!(%err, "study plan prompt built without history");
            Vec::new()
        });

        let request = StudyPlanRequest::from_attempt(&record, &history, self.submitted_at);
        let plan = match bounded(
            self.call_timeout,
            "study plan generation",
            self.generator.generate(&request),
        )
        .await
        {
            Ok(plan) => plan,
            Err(err) => {
                tracing::warn!(user = %identity.user_id, %err, "study plan generation failed");
                report.errors.push(match err {
                    QuizError::Timeout { .. } | QuizError::PlanGenerationFailed(_) => err,
                    other => QuizError::PlanGenerationFailed(other.to_string()),
                });
                return report;
            }
        };

        let stored = bounded(self.call_timeout, "store study plan", async {
            self.plans
                .put_plan(&plan)
                .await
                .map_err(|e| QuizError::PersistFailed(e.to_string()))
        })
        .await;
        if let Err(err) = stored {
            tracing::error!(user = %identity.user_id, %err, "failed to store study plan");
            report.errors.push(err);
        }
        report.plan = Some(plan);
        report
    }
}

/// Run `fut` with an upper bound on its duration.
async fn bounded<T, F>(limit: Duration, operation: &'static str, fut: F) -> Result<T, QuizError>
where
    F: Future<Output = Result<T, QuizError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(QuizError::Timeout {
            operation,
            seconds: limit.as_secs(),
        }),
    }
}
