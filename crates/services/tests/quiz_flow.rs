use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use quiz_core::model::{
    ConfirmedCourses, CourseName, CoursePlan, Identity, Question, QuestionId, StudyPlan, UserId,
};
use quiz_core::time::fixed_clock;
use services::sessions::{Advance, CountdownTimer, SessionStatus, Tick};
use services::study_plan::{StudyPlanGenerator, StudyPlanRequest};
use services::{
    QuestionBank, QuizError, QuizWorkflow, SessionContext, SessionError, SubmissionStatus, UserRole,
};
use storage::repository::{AttemptRepository, Storage, StudyPlanRepository};

struct FixedBank {
    questions: Vec<Question>,
    calls: AtomicUsize,
    fail_first: bool,
}

impl FixedBank {
    fn new(correct: &[usize]) -> Self {
        let questions = correct
            .iter()
            .enumerate()
            .map(|(i, c)| {
                Question::new(
                    QuestionId::new(i as u64),
                    format!("Question {i}"),
                    vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    *c,
                )
                .unwrap()
            })
            .collect();
        Self {
            questions,
            calls: AtomicUsize::new(0),
            fail_first: false,
        }
    }

    fn failing_once(mut self) -> Self {
        self.fail_first = true;
        self
    }
}

#[async_trait]
impl QuestionBank for FixedBank {
    async fn fetch(&self, _course: &CourseName, limit: u32) -> Result<Vec<Question>, QuizError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_first && call == 0 {
            return Err(QuizError::FetchFailed("connection reset".into()));
        }
        Ok(self.questions.iter().take(limit as usize).cloned().collect())
    }
}

struct SlowBank;

#[async_trait]
impl QuestionBank for SlowBank {
    async fn fetch(&self, _course: &CourseName, _limit: u32) -> Result<Vec<Question>, QuizError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

/// Records how many attempts were stored when generation was requested.
struct RecordingGenerator {
    attempts: Arc<dyn AttemptRepository>,
    stored_at_request: Mutex<Vec<usize>>,
    fail: bool,
}

#[async_trait]
impl StudyPlanGenerator for RecordingGenerator {
    async fn generate(&self, request: &StudyPlanRequest) -> Result<StudyPlan, QuizError> {
        let stored = self.attempts.list_attempts().await?.len();
        self.stored_at_request.lock().unwrap().push(stored);
        if self.fail {
            return Err(QuizError::PlanGenerationFailed("model unavailable".into()));
        }
        Ok(StudyPlan::new(
            request.user_id.clone(),
            request.requested_at,
            vec![CoursePlan {
                course: request.course.clone(),
                focus_areas: vec![format!("{} basics", request.course)],
                recommendations: vec![],
                schedule: vec![],
            }],
            vec![],
        )?)
    }
}

struct Harness {
    storage: Storage,
    generator: Arc<RecordingGenerator>,
    workflow: QuizWorkflow,
}

fn harness(bank: Arc<dyn QuestionBank>, fail_plan: bool) -> Harness {
    let storage = Storage::in_memory();
    let generator = Arc::new(RecordingGenerator {
        attempts: Arc::clone(&storage.attempts),
        stored_at_request: Mutex::new(Vec::new()),
        fail: fail_plan,
    });
    let workflow = QuizWorkflow::new(
        fixed_clock(),
        bank,
        Arc::clone(&storage.attempts),
        Arc::clone(&storage.plans),
        Arc::clone(&generator) as Arc<dyn StudyPlanGenerator>,
    )
    .with_seconds_per_question(30)
    .with_call_timeout(Duration::from_secs(5));
    Harness {
        storage,
        generator,
        workflow,
    }
}

fn sql() -> CourseName {
    CourseName::new("SQL").unwrap()
}

fn confirmed() -> ConfirmedCourses {
    let mut courses = ConfirmedCourses::new();
    courses.confirm(sql());
    courses
}

fn signed_in() -> SessionContext {
    SessionContext::signed_in(
        Identity::new(UserId::new("u1").unwrap(), "u1@example.com", "Uma"),
        UserRole::Student,
    )
}

#[tokio::test]
async fn submission_persists_before_generating_plan() {
    let h = harness(Arc::new(FixedBank::new(&[0, 1, 2])), false);
    let mut session = h.workflow.start(sql(), &confirmed()).await.unwrap();
    assert_eq!(session.status(), &SessionStatus::InProgress);

    for pick in [0, 1, 0] {
        session.select_option(pick).unwrap();
        session.next().unwrap();
    }
    let (outcome, handle) = h.workflow.submit(&signed_in(), &mut session).unwrap();
    assert_eq!(outcome.score, 2);
    assert!(session.is_complete());

    let report = handle.wait().await;
    assert!(report.is_clean(), "unexpected errors: {:?}", report.errors);
    assert!(report.persisted);
    assert_eq!(*h.generator.stored_at_request.lock().unwrap(), [1]);

    let key = report.attempt_key.unwrap();
    let stored = h.storage.attempts.get_attempt(&key).await.unwrap();
    assert_eq!(stored.score(), 2);
    assert_eq!(stored.total_questions(), 3);

    let plan = h
        .storage
        .plans
        .get_plan(&UserId::new("u1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(Some(&plan), report.plan.as_ref());
}

#[tokio::test]
async fn anonymous_submission_writes_nothing() {
    let h = harness(Arc::new(FixedBank::new(&[0])), false);
    let mut session = h.workflow.start(sql(), &confirmed()).await.unwrap();
    session.select_option(0).unwrap();
    session.next().unwrap();

    let (_outcome, handle) = h
        .workflow
        .submit(&SessionContext::anonymous(), &mut session)
        .unwrap();
    let report = handle.wait().await;

    assert!(!report.persisted);
    assert!(matches!(report.errors.as_slice(), [QuizError::AuthRequired]));
    assert!(h.storage.attempts.list_attempts().await.unwrap().is_empty());
    assert!(h.generator.stored_at_request.lock().unwrap().is_empty());
}

#[tokio::test]
async fn plan_failure_is_soft() {
    let h = harness(Arc::new(FixedBank::new(&[0, 1])), true);
    let mut session = h.workflow.start(sql(), &confirmed()).await.unwrap();
    for pick in [0, 1] {
        session.select_option(pick).unwrap();
        session.next().unwrap();
    }
    let (_outcome, handle) = h.workflow.submit(&signed_in(), &mut session).unwrap();
    let report = handle.wait().await;

    assert!(report.persisted);
    assert!(report.plan.is_none());
    assert!(matches!(
        report.errors.as_slice(),
        [QuizError::PlanGenerationFailed(_)]
    ));
    assert!(session.is_complete());
    assert_eq!(h.storage.attempts.list_attempts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unconfirmed_course_is_refused() {
    let h = harness(Arc::new(FixedBank::new(&[0])), false);
    let err = h
        .workflow
        .start(CourseName::new("Docker").unwrap(), &confirmed())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NoCourseSelected(_)));
}

#[tokio::test]
async fn fetch_failure_then_retry() {
    let h = harness(Arc::new(FixedBank::new(&[0, 1]).failing_once()), false);
    let mut session = h.workflow.start(sql(), &confirmed()).await.unwrap();
    assert!(matches!(session.status(), SessionStatus::FetchFailed { .. }));

    h.workflow.retry_fetch(&mut session).await.unwrap();
    assert_eq!(session.status(), &SessionStatus::InProgress);
    assert_eq!(session.progress().total, 2);
}

#[tokio::test(start_paused = true)]
async fn slow_question_bank_times_out() {
    let h = harness(Arc::new(SlowBank), false);
    let session = h.workflow.start(sql(), &confirmed()).await.unwrap();
    let SessionStatus::FetchFailed { reason } = session.status() else {
        panic!("expected fetch failure, got {:?}", session.status());
    };
    assert!(reason.contains("timed out"));
}

#[tokio::test(start_paused = true)]
async fn countdown_finishes_quiz_and_still_submits() {
    let h = harness(Arc::new(FixedBank::new(&[0, 1])), false);
    let mut session = h.workflow.start(sql(), &confirmed()).await.unwrap();
    session.select_option(0).unwrap();
    assert_eq!(session.next().unwrap(), Advance::Moved);

    // No selection on the last question; let the clock run out.
    let (mut timer, mut ticks) = CountdownTimer::new();
    timer.restart();
    let outcome = loop {
        let tick = ticks.recv().await.unwrap();
        if !timer.is_current(tick) {
            continue;
        }
        match session.tick().unwrap() {
            Tick::Running(_) => {}
            Tick::Advanced => timer.restart(),
            Tick::Finished(outcome) => {
                timer.cancel();
                break outcome;
            }
        }
    };
    assert!(!timer.is_running());
    assert_eq!(outcome.outcomes[1].user_answer, None);
    assert_eq!(session.answers(), [Some(0), None]);

    let (_outcome, handle) = h.workflow.submit(&signed_in(), &mut session).unwrap();
    assert_eq!(session.status(), &SessionStatus::Completed);
    let report = handle.wait().await;
    assert!(report.persisted);
    assert_eq!(h.storage.attempts.list_attempts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn handle_reports_done_after_completion() {
    let h = harness(Arc::new(FixedBank::new(&[0])), false);
    let mut session = h.workflow.start(sql(), &confirmed()).await.unwrap();
    session.select_option(0).unwrap();
    session.next().unwrap();
    let (_outcome, handle) = h.workflow.submit(&signed_in(), &mut session).unwrap();

    while handle.status() == SubmissionStatus::Pending {
        tokio::task::yield_now().await;
    }
    assert!(handle.wait().await.persisted);
}

#[tokio::test]
async fn submit_twice_is_refused() {
    let h = harness(Arc::new(FixedBank::new(&[0])), false);
    let mut session = h.workflow.start(sql(), &confirmed()).await.unwrap();
    session.select_option(0).unwrap();
    session.next().unwrap();
    let (_outcome, handle) = h.workflow.submit(&signed_in(), &mut session).unwrap();
    handle.wait().await;

    assert!(matches!(
        h.workflow.submit(&signed_in(), &mut session),
        Err(SessionError::Completed)
    ));
}
