use std::sync::Arc;

use reqwest::Client;
use storage::repository::{AttemptRepository, Storage};

use crate::Clock;
use crate::config::AppConfig;
use crate::error::AppServicesError;
use crate::leaderboard::LeaderboardService;
use crate::question_bank::{QuestionBank, QuizApiClient};
use crate::results::ResultsService;
use crate::sessions::QuizWorkflow;
use crate::study_plan::{ChatStudyPlanClient, StudyPlanGenerator};

/// Assembles app-facing services from configuration.
#[derive(Clone)]
pub struct AppServices {
    workflow: Arc<QuizWorkflow>,
    leaderboard: Arc<LeaderboardService>,
    results: Arc<ResultsService>,
    attempts: Arc<dyn AttemptRepository>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the configured HTTP endpoints.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the HTTP
    /// client cannot be built.
    pub async fn new_sqlite(config: &AppConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.database_url).await?;
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let questions: Arc<dyn QuestionBank> =
            Arc::new(QuizApiClient::new(client.clone(), config.quiz_api.clone()));
        let generator: Arc<dyn StudyPlanGenerator> =
            Arc::new(ChatStudyPlanClient::new(client, config.study_plan.clone()));
        if config.study_plan.is_none() {
            tracing::info!("STUDY_PLAN_API_KEY not set; study plans are disabled");
        }
        Ok(Self::from_parts(config, clock, storage, questions, generator))
    }

    /// Wire services over already-built adapters.
    #[must_use]
    pub fn from_parts(
        config: &AppConfig,
        clock: Clock,
        storage: Storage,
        questions: Arc<dyn QuestionBank>,
        generator: Arc<dyn StudyPlanGenerator>,
    ) -> Self {
        let workflow = QuizWorkflow::new(
            clock,
            questions,
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.plans),
            generator,
        )
        .with_question_limit(config.quiz_api.question_limit)
        .with_seconds_per_question(config.seconds_per_question)
        .with_call_timeout(config.request_timeout);

        Self {
            workflow: Arc::new(workflow),
            leaderboard: Arc::new(LeaderboardService::new(Arc::clone(&storage.attempts))),
            results: Arc::new(ResultsService::new(
                Arc::clone(&storage.attempts),
                Arc::clone(&storage.plans),
            )),
            attempts: storage.attempts,
        }
    }

    #[must_use]
    pub fn workflow(&self) -> Arc<QuizWorkflow> {
        Arc::clone(&self.workflow)
    }

    #[must_use]
    pub fn leaderboard(&self) -> Arc<LeaderboardService> {
        Arc::clone(&self.leaderboard)
    }

    #[must_use]
    pub fn results(&self) -> Arc<ResultsService> {
        Arc::clone(&self.results)
    }

    #[must_use]
    pub fn attempts(&self) -> Arc<dyn AttemptRepository> {
        Arc::clone(&self.attempts)
    }
}
