use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::course::CourseName;
use crate::model::ids::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudyPlanError {
    #[error("study plan has no courses")]
    NoCourses,

    #[error("study plan lists course {0} more than once")]
    DuplicateCourse(String),
}

/// One day of the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub day: u32,
    #[serde(default)]
    pub tasks: Vec<String>,
}

/// Breakdown for a single course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePlan {
    pub course: CourseName,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub schedule: Vec<DayPlan>,
}

/// A study resource suggested by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    pub link: String,
}

/// Generated study plan for one user. Stored under the user id and replaced
/// wholesale on every regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlan {
    user_id: UserId,
    generated_at: DateTime<Utc>,
    courses: Vec<CoursePlan>,
    #[serde(default)]
    resources: Vec<Resource>,
}

impl StudyPlan {
    /// # Errors
    ///
    /// Returns `StudyPlanError` if there are no courses or a course repeats.
    pub fn new(
        user_id: UserId,
        generated_at: DateTime<Utc>,
        courses: Vec<CoursePlan>,
        resources: Vec<Resource>,
    ) -> Result<Self, StudyPlanError> {
        if courses.is_empty() {
            return Err(StudyPlanError::NoCourses);
        }
        for (i, plan) in courses.iter().enumerate() {
            if courses[..i].iter().any(|p| p.course == plan.course) {
                return Err(StudyPlanError::DuplicateCourse(plan.course.to_string()));
            }
        }
        Ok(Self {
            user_id,
            generated_at,
            courses,
            resources,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    #[must_use]
    pub fn courses(&self) -> &[CoursePlan] {
        &self.courses
    }

    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    #[must_use]
    pub fn course(&self, course: &CourseName) -> Option<&CoursePlan> {
        self.courses.iter().find(|p| &p.course == course)
    }

    /// Re-run constructor checks on a deserialized plan.
    ///
    /// # Errors
    ///
    /// Same as [`StudyPlan::new`].
    pub fn validate(self) -> Result<Self, StudyPlanError> {
        Self::new(self.user_id, self.generated_at, self.courses, self.resources)
    }
}
