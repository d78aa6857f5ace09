//! Interactive quiz loop on the terminal.

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use quiz_core::model::{ConfirmedCourses, CourseCatalog, Identity, UserId, option_label};
use services::sessions::{Advance, CountdownTimer, QuizOutcome, QuizSession, SessionStatus, Tick};
use services::{AppServices, SessionContext, UserRole};

use crate::args::QuizArgs;
use crate::render;

type Input = Lines<BufReader<Stdin>>;

/// Seconds left at which the countdown is announced.
const ANNOUNCE_AT: [u32; 4] = [20, 10, 5, 3];

enum Command {
    Select(usize),
    Next,
    Previous,
    Quit,
    Unknown,
}

fn parse_command(line: &str) -> Command {
    match line.trim().to_ascii_lowercase().as_str() {
        "n" | "next" => Command::Next,
        "p" | "prev" | "previous" => Command::Previous,
        "q" | "quit" => Command::Quit,
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c @ 'a'..='d'), None) => Command::Select(usize::from(c as u8 - b'a')),
                _ => Command::Unknown,
            }
        }
    }
}

pub async fn run(app: &AppServices, args: QuizArgs) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = CourseCatalog::default();
    if catalog.find(&args.course).is_none() {
        tracing::warn!(course = %args.course, "course is not in the default catalog");
    }
    let course = catalog.resolve(&args.course)?;
    let identity = Identity::new(UserId::new(args.user.as_str())?, args.email, args.name);
    println!("Signed in as {}.", identity.display_name());
    let ctx = SessionContext::signed_in(identity, UserRole::Student);

    let mut confirmed = ConfirmedCourses::new();
    let ranking = confirmed.confirm(course.clone());
    tracing::debug!(course = %course, ranking, "course confirmed");

    let workflow = app.workflow();
    let mut input: Input = BufReader::new(tokio::io::stdin()).lines();

    println!("Loading {course} quiz...");
    let mut session = workflow.start(course, &confirmed).await?;
    while let SessionStatus::FetchFailed { reason } = session.status() {
        println!("Could not load questions: {reason}");
        println!("Retry? [y/N]");
        match input.next_line().await? {
            Some(answer) if answer.trim().eq_ignore_ascii_case("y") => {
                workflow.retry_fetch(&mut session).await?;
            }
            _ => return Ok(()),
        }
    }

    let Some(outcome) = drive(&mut session, &mut input).await? else {
        println!("Quiz abandoned; nothing was saved.");
        return Ok(());
    };

    let (_outcome, handle) = workflow.submit(&ctx, &mut session)?;
    render::outcome(&outcome);
    render::answer_review(&session);

    println!();
    println!("Saving your result and preparing a study plan...");
    let report = handle.wait().await;
    render::submission(&report);

    let view = app.results().view_for(&ctx.require_identity()?.user_id).await?;
    render::result_view(&view);
    Ok(())
}

/// Run the question loop until the quiz finishes (`Some`) or the user quits (`None`).
async fn drive(
    session: &mut QuizSession,
    input: &mut Input,
) -> Result<Option<QuizOutcome>, Box<dyn std::error::Error>> {
    let (mut timer, mut ticks) = CountdownTimer::new();
    show_question(session);
    timer.restart();

    loop {
        tokio::select! {
            Some(tick) = ticks.recv() => {
                if !timer.is_current(tick) {
                    continue;
                }
                match session.tick()? {
                    Tick::Running(left) => {
                        if ANNOUNCE_AT.contains(&left) {
                            println!("  {left}s left");
                        }
                    }
                    Tick::Advanced => {
                        println!("Time's up!");
                        show_question(session);
                        timer.restart();
                    }
                    Tick::Finished(outcome) => {
                        println!("Time's up!");
                        timer.cancel();
                        return Ok(Some(outcome));
                    }
                }
            }
            line = input.next_line() => {
                let Some(line) = line? else {
                    timer.cancel();
                    return Ok(None);
                };
                match parse_command(&line) {
                    Command::Select(index) => match session.select_option(index) {
                        Ok(()) => println!("Selected {}", option_label(index)),
                        Err(err) => println!("{err}"),
                    },
                    Command::Next => match session.next()? {
                        Advance::Ignored => println!("Select an option first."),
                        Advance::Moved => {
                            show_question(session);
                            timer.restart();
                        }
                        Advance::Finished(outcome) => {
                            timer.cancel();
                            return Ok(Some(outcome));
                        }
                    },
                    Command::Previous => {
                        if session.previous()? {
                            show_question(session);
                            timer.restart();
                        } else {
                            println!("Already on the first question.");
                        }
                    }
                    Command::Quit => {
                        timer.cancel();
                        return Ok(None);
                    }
                    Command::Unknown => {
                        println!("Type a-d to choose, n for next, p for previous, q to quit.");
                    }
                }
            }
        }
    }
}

fn show_question(session: &QuizSession) {
    let Some(question) = session.current_question() else {
        return;
    };
    let progress = session.progress();
    println!();
    println!(
        "Question {}/{} ({}%)  [{}s]",
        progress.current,
        progress.total,
        progress.percent,
        session.time_remaining()
    );
    println!("{}", question.text());
    for (i, option) in question.options().iter().enumerate() {
        let marker = if session.selection() == Some(i) { '>' } else { ' ' };
        println!(" {marker} {}) {option}", option_label(i).to_ascii_lowercase());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_parsed_case_insensitively() {
        assert!(matches!(parse_command("B"), Command::Select(1)));
        assert!(matches!(parse_command(" n "), Command::Next));
        assert!(matches!(parse_command("previous"), Command::Previous));
        assert!(matches!(parse_command("q"), Command::Quit));
        assert!(matches!(parse_command("zz"), Command::Unknown));
    }
}
