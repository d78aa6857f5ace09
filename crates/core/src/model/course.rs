use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course name cannot be empty")]
    EmptyName,
}

/// A course (question-bank category) such as `SQL` or `Docker`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CourseName(String);

impl CourseName {
    /// # Errors
    ///
    /// Returns `CourseError::EmptyName` if the name is blank.
    pub fn new(name: impl Into<String>) -> Result<Self, CourseError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(CourseError::EmptyName);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CourseName {
    type Error = CourseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CourseName> for String {
    fn from(course: CourseName) -> Self {
        course.0
    }
}

impl fmt::Debug for CourseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CourseName({})", self.0)
    }
}

impl fmt::Display for CourseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Categories offered by the question bank.
pub const DEFAULT_CATEGORIES: [&str; 4] = ["Linux", "DevOps", "Docker", "SQL"];

/// The list of courses a student can pick from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseCatalog {
    courses: Vec<CourseName>,
}

impl CourseCatalog {
    #[must_use]
    pub fn new(courses: Vec<CourseName>) -> Self {
        Self { courses }
    }

    #[must_use]
    pub fn courses(&self) -> &[CourseName] {
        &self.courses
    }

    /// Case-insensitive lookup, returning the catalog's spelling.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&CourseName> {
        let needle = name.trim();
        self.courses
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
    }

    /// The catalog's spelling of `name`, or `name` itself for courses outside the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyName` if `name` is blank.
    pub fn resolve(&self, name: &str) -> Result<CourseName, CourseError> {
        match self.find(name) {
            Some(course) => Ok(course.clone()),
            None => CourseName::new(name),
        }
    }
}

impl Default for CourseCatalog {
    fn default() -> Self {
        let courses = DEFAULT_CATEGORIES
            .iter()
            .filter_map(|name| CourseName::new(*name).ok())
            .collect();
        Self { courses }
    }
}

/// A course the user confirmed on the home screen, with its display ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedCourse {
    pub name: CourseName,
    pub ranking: u32,
}

/// Courses the user has confirmed. A quiz can only be started for one of these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedCourses {
    courses: Vec<ConfirmedCourse>,
}

impl ConfirmedCourses {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirm a course. Re-confirming an existing course is a no-op.
    ///
    /// Returns the ranking assigned to the course.
    pub fn confirm(&mut self, name: CourseName) -> u32 {
        if let Some(existing) = self.courses.iter().find(|c| c.name == name) {
            return existing.ranking;
        }
        let ranking = u32::try_from(self.courses.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        self.courses.push(ConfirmedCourse { name, ranking });
        ranking
    }

    #[must_use]
    pub fn contains(&self, name: &CourseName) -> bool {
        self.courses.iter().any(|c| &c.name == name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &ConfirmedCourse> {
        self.courses.iter()
    }
}
