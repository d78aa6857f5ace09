//! Study plan generation through an OpenAI-compatible chat endpoint.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use quiz_core::model::{
    CourseName, CoursePlan, QuizAttemptRecord, Resource, StudyPlan, UserId, option_label,
};

use crate::config::StudyPlanConfig;
use crate::error::QuizError;

/// A course with any attempt scoring below this percentage is a weak area.
pub const WEAK_AREA_BELOW: u8 = 70;

/// One question of the attempt, as shown to the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSummary {
    pub question: String,
    pub user_answer: Option<String>,
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviousScore {
    pub topic: CourseName,
    pub score: u8,
}

/// Everything the generator is told about the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlanRequest {
    pub user_id: UserId,
    pub course: CourseName,
    pub score: u32,
    pub total_questions: u32,
    pub answers: Vec<AnswerSummary>,
    pub topics: Vec<CourseName>,
    pub previous_scores: Vec<PreviousScore>,
    pub weak_areas: Vec<CourseName>,
    #[serde(skip)]
    pub requested_at: DateTime<Utc>,
}

impl StudyPlanRequest {
    /// Summarise `attempt` together with the user's earlier attempts.
    ///
    /// `history` may or may not include `attempt`; it is de-duplicated by
    /// timestamp and course.
    #[must_use]
    pub fn from_attempt(
        attempt: &QuizAttemptRecord,
        history: &[QuizAttemptRecord],
        requested_at: DateTime<Utc>,
    ) -> Self {
        let answers = attempt
            .answers()
            .iter()
            .map(|outcome| AnswerSummary {
                question: outcome.question.clone(),
                user_answer: outcome.user_answer.map(|i| describe_option(&outcome.options, i)),
                correct_answer: describe_option(&outcome.options, outcome.correct_answer),
            })
            .collect();

        let mut all: Vec<&QuizAttemptRecord> = history
            .iter()
            .filter(|r| !(r.timestamp() == attempt.timestamp() && r.course() == attempt.course()))
            .collect();
        all.push(attempt);
        all.sort_by_key(|r| r.timestamp());

        let previous_scores = all
            .iter()
            .map(|r| PreviousScore {
                topic: r.course().clone(),
                score: r.percentage(),
            })
            .collect();

        let mut topics: Vec<CourseName> = Vec::new();
        let mut weak: BTreeSet<&CourseName> = BTreeSet::new();
        for record in &all {
            if !topics.contains(record.course()) {
                topics.push(record.course().clone());
            }
            if record.percentage() < WEAK_AREA_BELOW {
                weak.insert(record.course());
            }
        }
        let weak_areas = weak.into_iter().cloned().collect();

        Self {
            user_id: attempt.user_id().clone(),
            course: attempt.course().clone(),
            score: attempt.score(),
            total_questions: attempt.total_questions(),
            answers,
            topics,
            previous_scores,
            weak_areas,
            requested_at,
        }
    }

    /// Prompt text sent to the chat model.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::PlanGenerationFailed` if the request cannot be serialized.
    pub fn prompt(&self) -> Result<String, QuizError> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| QuizError::PlanGenerationFailed(e.to_string()))?;
        Ok(format!(
            "You are a study coach. Generate a study plan and resources for the student data below.\n\
             Reply with JSON only, in this shape:\n\
             {{\"courses\": [{{\"course\": string, \"focusAreas\": [string], \"recommendations\": [string], \
             \"schedule\": [{{\"day\": number, \"tasks\": [string]}}]}}], \
             \"resources\": [{{\"title\": string, \"link\": string}}]}}\n\
             Include at least the course \"{course}\" and every weak area.\n\n\
             Student data:\n{data}",
            course = self.course,
        ))
    }
}

fn describe_option(options: &[String], index: usize) -> String {
    match options.get(index) {
        Some(text) => format!("{}. {text}", option_label(index)),
        None => option_label(index).to_string(),
    }
}

/// Produces a study plan for a finished attempt.
#[async_trait]
pub trait StudyPlanGenerator: Send + Sync {
    /// # Errors
    ///
    /// Returns `QuizError::PlanGenerationFailed` when no usable plan comes back.
    async fn generate(&self, request: &StudyPlanRequest) -> Result<StudyPlan, QuizError>;
}

#[derive(Debug, Deserialize)]
struct PlanReply {
    #[serde(default)]
    courses: Vec<CoursePlan>,
    #[serde(default)]
    resources: Vec<Resource>,
}

/// Strip a surrounding markdown code fence (optionally tagged `json`).
#[must_use]
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse the model's reply into a plan for `request`.
///
/// # Errors
///
/// Returns `QuizError::PlanGenerationFailed` if the reply is not the expected
/// JSON shape or lists no courses.
pub fn parse_plan_reply(content: &str, request: &StudyPlanRequest) -> Result<StudyPlan, QuizError> {
    let reply: PlanReply = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| QuizError::PlanGenerationFailed(format!("unreadable plan: {e}")))?;
    Ok(StudyPlan::new(
        request.user_id.clone(),
        request.requested_at,
        reply.courses,
        reply.resources,
    )?)
}

/// Chat-completions client. Disabled (every call fails) without an API key.
#[derive(Clone)]
pub struct ChatStudyPlanClient {
    client: Client,
    config: Option<StudyPlanConfig>,
}

impl ChatStudyPlanClient {
    #[must_use]
    pub fn new(client: Client, config: Option<StudyPlanConfig>) -> Self {
        Self { client, config }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    async fn complete(
        &self,
        config: &StudyPlanConfig,
        prompt: String,
    ) -> Result<String, QuizError> {
        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| QuizError::PlanGenerationFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(QuizError::PlanGenerationFailed(format!(
                "chat endpoint returned status {}",
                response.status()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| QuizError::PlanGenerationFailed(e.to_string()))?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| QuizError::PlanGenerationFailed("empty response".into()))
    }
}

#[async_trait]
impl StudyPlanGenerator for ChatStudyPlanClient {
    async fn generate(&self, request: &StudyPlanRequest) -> Result<StudyPlan, QuizError> {
        let config = self.config.as_ref().ok_or_else(|| {
            QuizError::PlanGenerationFailed("study plans are not configured".into())
        })?;
        let content = self.complete(config, request.prompt()?).await?;
        let plan = parse_plan_reply(&content, request)?;
        tracing::info!(
            user = %request.user_id,
            courses = plan.courses().len(),
            "generated study plan"
        );
        Ok(plan)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
