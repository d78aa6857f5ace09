mod attempt;
mod course;
mod identity;
mod ids;
mod question;
mod study_plan;

pub use ids::{ParseIdError, QuestionId, UserId};

pub use attempt::{QuestionOutcome, QuizAttemptRecord, RecordError};
pub use course::{
    ConfirmedCourse, ConfirmedCourses, CourseCatalog, CourseError, CourseName, DEFAULT_CATEGORIES,
};
pub use identity::Identity;
pub use question::{MAX_OPTIONS, MIN_OPTIONS, Question, QuestionError, option_label};
pub use study_plan::{CoursePlan, DayPlan, Resource, StudyPlan, StudyPlanError};
