//! Plain-text rendering of services views.

use std::collections::BTreeMap;

use quiz_core::leaderboard::{LeaderboardEntry, RankedEntry};
use quiz_core::model::{CourseName, StudyPlan, option_label};
use services::results::PlanView;
use services::sessions::{QuizOutcome, QuizSession};
use services::{ResultView, SubmissionReport};

pub fn outcome(outcome: &QuizOutcome) {
    println!();
    println!(
        "You scored {}/{} ({}%) in {}.",
        outcome.score, outcome.total, outcome.percentage, outcome.course
    );
}

pub fn answer_review(session: &QuizSession) {
    println!();
    println!("Answers:");
    for (i, row) in session.answer_review().into_iter().enumerate() {
        let mark = if row.is_correct { "ok" } else { "x " };
        println!("[{mark}] {}. {}", i + 1, row.question.text());
        let yours = match (row.user_answer, row.user_text()) {
            (Some(index), Some(text)) => format!("{}) {text}", option_label(index)),
            _ => "no answer".to_string(),
        };
        println!("      your answer: {yours}");
        if !row.is_correct {
            println!(
                "      correct:     {}) {}",
                option_label(row.question.correct_option()),
                row.correct_text()
            );
        }
    }
}

pub fn submission(report: &SubmissionReport) {
    if report.persisted {
        println!("Result saved.");
    }
    for err in &report.errors {
        println!("warning: {err}");
    }
}

pub fn result_view(view: &ResultView) {
    let Some(latest) = &view.latest else {
        println!("No quiz results yet.");
        return;
    };
    println!();
    println!(
        "Latest: {} {}/{} ({}%)",
        latest.course, latest.score, latest.total, latest.percentage
    );
    println!("{}", latest.message);
    for tip in latest.recommendations {
        println!("  - {tip}");
    }

    if view.history.len() > 1 {
        println!();
        println!("History:");
        for row in &view.history {
            println!(
                "  {}  {:<8} {}/{} ({}%)",
                row.taken_at.format("%Y-%m-%d %H:%M"),
                row.course.as_str(),
                row.score,
                row.total,
                row.percentage
            );
        }
    }

    match &view.plan {
        Some(plan) => plan_view(plan),
        None => println!("No study plan yet."),
    }
}

pub fn plan_view(plan: &PlanView) {
    println!();
    println!("Study plan (generated {}):", plan.generated_at.format("%Y-%m-%d"));
    for course in &plan.courses {
        println!("  {}", course.course);
        for area in &course.focus_areas {
            println!("    focus: {area}");
        }
        for tip in &course.recommendations {
            println!("    - {tip}");
        }
        for day in &course.schedule {
            println!("    day {}: {}", day.day, day.tasks.join("; "));
        }
    }
    if !plan.resources.is_empty() {
        println!("  Resources:");
        for resource in &plan.resources {
            println!("    {} <{}>", resource.title, resource.link);
        }
    }
}

pub fn stored_plan(plan: &StudyPlan) {
    plan_view(&PlanView {
        generated_at: plan.generated_at(),
        courses: plan.courses().to_vec(),
        resources: plan.resources().to_vec(),
    });
}

pub fn ranked_board(course: &CourseName, rows: &[RankedEntry]) {
    println!("{course}");
    if rows.is_empty() {
        println!("  no results");
        return;
    }
    println!("  {:>4}  {:<24} {:>8} {:>8}", "rank", "name", "average", "attempts");
    for row in rows {
        entry_line(row.rank, &row.entry);
    }
}

pub fn all_boards(boards: &BTreeMap<CourseName, Vec<RankedEntry>>) {
    if boards.is_empty() {
        println!("No quiz results found.");
        return;
    }
    for (course, rows) in boards {
        ranked_board(course, rows);
        println!();
    }
}

fn entry_line(rank: usize, entry: &LeaderboardEntry) {
    let name = if entry.user_name.trim().is_empty() {
        entry.user_email.as_str()
    } else {
        entry.user_name.as_str()
    };
    println!(
        "  {:>4}  {:<24} {:>8.1} {:>8}",
        rank,
        name,
        entry.average_score,
        entry.attempt_count
    );
}
