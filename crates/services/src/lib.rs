#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod leaderboard;
pub mod question_bank;
pub mod results;
pub mod sessions;
pub mod study_plan;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use config::AppConfig;
pub use context::{SessionContext, UserRole};
pub use error::{AppServicesError, ConfigError, ExportError, QuizError, SessionError};
pub use leaderboard::LeaderboardService;
pub use question_bank::{QuestionBank, QuizApiClient};
pub use results::{ResultView, ResultsService};
pub use sessions::{
    Advance, CountdownTimer, QuizOutcome, QuizSession, QuizWorkflow, SessionStatus,
    SubmissionHandle, SubmissionReport, SubmissionStatus, Tick, TimerTick,
};
pub use study_plan::{ChatStudyPlanClient, StudyPlanGenerator, StudyPlanRequest};
