mod progress;
mod session;
pub mod timer;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use session::{AnswerReview, Advance, QuizOutcome, QuizSession, SessionStatus, Tick};
pub use timer::{CountdownTimer, TimerTick};
pub use workflow::{QuizWorkflow, SubmissionHandle, SubmissionReport, SubmissionStatus};
