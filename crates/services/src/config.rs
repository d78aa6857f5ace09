//! Environment-driven configuration.
//!
//! Values come from the process environment after loading an optional `.env`
//! file. Unset keys fall back to defaults; set but unparsable keys are errors.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_DB_URL: &str = "sqlite://quizdeck.sqlite3";
pub const DEFAULT_QUIZ_API_URL: &str = "https://quizapi.io/api/v1/questions";
pub const DEFAULT_QUESTION_LIMIT: u32 = 15;
pub const DEFAULT_SECONDS_PER_QUESTION: u32 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_STUDY_PLAN_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_STUDY_PLAN_MODEL: &str = "gpt-4o-mini";

/// Question bank endpoint settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub question_limit: u32,
}

/// Chat-completions endpoint used to generate study plans.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StudyPlanConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub quiz_api: QuizApiConfig,
    pub seconds_per_question: u32,
    pub request_timeout: Duration,
    /// `None` when no API key is configured; plan generation is then disabled.
    pub study_plan: Option<StudyPlanConfig>,
    pub rust_log: String,
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when a numeric setting does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when a numeric setting does not parse
    /// or is zero.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = non_empty("QUIZDECK_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.into());
        let quiz_api = QuizApiConfig {
            base_url: non_empty("QUIZ_API_URL").unwrap_or_else(|| DEFAULT_QUIZ_API_URL.into()),
            api_key: non_empty("QUIZ_API_KEY"),
            question_limit: parse_positive(
                "QUIZ_QUESTION_LIMIT",
                non_empty("QUIZ_QUESTION_LIMIT"),
                DEFAULT_QUESTION_LIMIT,
            )?,
        };
        let seconds_per_question = parse_positive(
            "QUIZ_SECONDS_PER_QUESTION",
            non_empty("QUIZ_SECONDS_PER_QUESTION"),
            DEFAULT_SECONDS_PER_QUESTION,
        )?;
        let timeout_secs = parse_positive(
            "QUIZDECK_REQUEST_TIMEOUT_SECS",
            non_empty("QUIZDECK_REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        let study_plan = non_empty("STUDY_PLAN_API_KEY").map(|api_key| StudyPlanConfig {
            base_url: non_empty("STUDY_PLAN_BASE_URL")
                .unwrap_or_else(|| DEFAULT_STUDY_PLAN_BASE_URL.into()),
            api_key,
            model: non_empty("STUDY_PLAN_MODEL").unwrap_or_else(|| DEFAULT_STUDY_PLAN_MODEL.into()),
        });
        let rust_log = non_empty("RUST_LOG").unwrap_or_else(|| "info".into());

        Ok(Self {
            database_url,
            quiz_api,
            seconds_per_question,
            request_timeout: Duration::from_secs(timeout_secs),
            study_plan,
            rust_log,
        })
    }
}

fn parse_positive<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq,
    T::Err: std::fmt::Display,
{
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value = raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })?;
    if value == T::default() {
        return Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "must be greater than zero".into(),
        });
    }
    Ok(value)
}
