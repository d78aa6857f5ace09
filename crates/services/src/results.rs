//! Shapes stored attempts and plans into what the result screen shows.
//!
//! Pure data shaping; [`ResultsService`] only loads the inputs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use quiz_core::model::{CourseName, CoursePlan, QuizAttemptRecord, Resource, StudyPlan, UserId};
use quiz_core::scoring::ScoreTier;
use storage::repository::{AttemptRepository, StorageError, StudyPlanRepository};

/// The most recent attempt with its qualitative feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestResult {
    pub course: CourseName,
    pub score: u32,
    pub total: u32,
    pub percentage: u8,
    pub tier: ScoreTier,
    pub message: &'static str,
    pub recommendations: [&'static str; 3],
}

impl LatestResult {
    #[must_use]
    pub fn from_record(record: &QuizAttemptRecord) -> Self {
        let percentage = record.percentage();
        let tier = ScoreTier::from_percentage(percentage);
        Self {
            course: record.course().clone(),
            score: record.score(),
            total: record.total_questions(),
            percentage,
            tier,
            message: tier.message(),
            recommendations: tier.recommendations(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRow {
    pub course: CourseName,
    pub score: u32,
    pub total: u32,
    pub percentage: u8,
    pub taken_at: DateTime<Utc>,
}

/// Per-course breakdown of a stored study plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanView {
    pub generated_at: DateTime<Utc>,
    pub courses: Vec<CoursePlan>,
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultView {
    pub latest: Option<LatestResult>,
    /// Newest first.
    pub history: Vec<HistoryRow>,
    pub plan: Option<PlanView>,
}

impl ResultView {
    /// Build the view from one user's attempts and their plan, if any.
    #[must_use]
    pub fn build(records: &[QuizAttemptRecord], plan: Option<&StudyPlan>) -> Self {
        let mut ordered: Vec<&QuizAttemptRecord> = records.iter().collect();
        // Stable sort keeps write order among equal timestamps; newest first.
        ordered.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));

        let latest = ordered.first().map(|r| LatestResult::from_record(r));
        let history = ordered
            .iter()
            .map(|r| HistoryRow {
                course: r.course().clone(),
                score: r.score(),
                total: r.total_questions(),
                percentage: r.percentage(),
                taken_at: r.timestamp(),
            })
            .collect();
        let plan = plan.map(|p| PlanView {
            generated_at: p.generated_at(),
            courses: p.courses().to_vec(),
            resources: p.resources().to_vec(),
        });

        Self {
            latest,
            history,
            plan,
        }
    }
}

/// Loads a user's attempts and plan and builds the [`ResultView`].
#[derive(Clone)]
pub struct ResultsService {
    attempts: Arc<dyn AttemptRepository>,
    plans: Arc<dyn StudyPlanRepository>,
}

impl ResultsService {
    #[must_use]
    pub fn new(attempts: Arc<dyn AttemptRepository>, plans: Arc<dyn StudyPlanRepository>) -> Self {
        Self { attempts, plans }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if attempts or the plan cannot be read.
    pub async fn view_for(&self, user: &UserId) -> Result<ResultView, StorageError> {
        let records: Vec<QuizAttemptRecord> = self
            .attempts
            .list_attempts_for_user(user)
            .await?
            .into_iter()
            .map(|row| row.record)
            .collect();
        let plan = self.plans.get_plan(user).await?;
        Ok(ResultView::build(&records, plan.as_ref()))
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the stored plan cannot be read.
    pub async fn plan_for(&self, user: &UserId) -> Result<Option<StudyPlan>, StorageError> {
        self.plans.get_plan(user).await
    }
}
