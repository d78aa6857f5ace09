use std::fmt;
use std::path::PathBuf;

use quiz_core::leaderboard::{LeaderboardSort, SortDirection, SortField};

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidSort { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidSort { raw } => {
                write!(f, "invalid --sort value: {raw} (expected avg or attempts)")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizArgs {
    pub course: String,
    pub user: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardArgs {
    pub course: Option<String>,
    pub sort: LeaderboardSort,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quiz(QuizArgs),
    Leaderboard(LeaderboardArgs),
    Plan { user: String },
    Export { out: PathBuf },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// Overrides `QUIZDECK_DB_URL` when set.
    pub db_url: Option<String>,
    pub command: Command,
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quizdeck quiz --course <name> --user <id> [--email <email>] [--name <name>]");
    eprintln!("  quizdeck leaderboard [--course <name>] [--sort avg|attempts] [--asc] [--search <q>]");
    eprintln!("  quizdeck plan --user <id>");
    eprintln!("  quizdeck export --out <file>");
    eprintln!();
    eprintln!("Every command accepts --db <sqlite_url>.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZDECK_DB_URL, QUIZ_API_URL, QUIZ_API_KEY, QUIZ_QUESTION_LIMIT,");
    eprintln!("  QUIZ_SECONDS_PER_QUESTION, QUIZDECK_REQUEST_TIMEOUT_SECS,");
    eprintln!("  STUDY_PLAN_API_KEY, STUDY_PLAN_BASE_URL, STUDY_PLAN_MODEL, RUST_LOG");
}

impl Args {
    pub fn parse(argv: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter();
        let Some(cmd) = args.next() else {
            return Ok(Self {
                db_url: None,
                command: Command::Help,
            });
        };

        let mut db_url = None;
        let mut flags: Vec<(String, Option<String>)> = Vec::new();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = Some(normalize_sqlite_url(value));
                }
                "--asc" => flags.push((arg, None)),
                "--help" | "-h" => {
                    return Ok(Self {
                        db_url,
                        command: Command::Help,
                    });
                }
                "--course" | "--user" | "--email" | "--name" | "--sort" | "--search"
                | "--out" => {
                    let flag = static_flag(&arg);
                    let value = require_value(&mut args, flag)?;
                    flags.push((arg, Some(value)));
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match cmd.as_str() {
            "quiz" => Command::Quiz(QuizArgs {
                course: take(&mut flags, "--course")?,
                user: take(&mut flags, "--user")?,
                email: take_opt(&mut flags, "--email").unwrap_or_default(),
                name: take_opt(&mut flags, "--name").unwrap_or_default(),
            }),
            "leaderboard" => {
                let field = match take_opt(&mut flags, "--sort").as_deref() {
                    None | Some("avg") => SortField::AverageScore,
                    Some("attempts") => SortField::AttemptCount,
                    Some(other) => {
                        return Err(ArgsError::InvalidSort {
                            raw: other.to_string(),
                        });
                    }
                };
                let direction = if take_switch(&mut flags, "--asc") {
                    SortDirection::Ascending
                } else {
                    SortDirection::Descending
                };
                Command::Leaderboard(LeaderboardArgs {
                    course: take_opt(&mut flags, "--course"),
                    sort: LeaderboardSort::new(field, direction),
                    search: take_opt(&mut flags, "--search"),
                })
            }
            "plan" => Command::Plan {
                user: take(&mut flags, "--user")?,
            },
            "export" => Command::Export {
                out: PathBuf::from(take(&mut flags, "--out")?),
            },
            "help" | "--help" | "-h" => Command::Help,
            other => return Err(ArgsError::UnknownCommand(other.to_string())),
        };

        // Flags that belong to another command.
        if let Some((flag, _)) = flags.into_iter().next() {
            return Err(ArgsError::UnknownArg(flag));
        }

        Ok(Self { db_url, command })
    }
}

fn static_flag(arg: &str) -> &'static str {
    match arg {
        "--course" => "--course",
        "--user" => "--user",
        "--email" => "--email",
        "--name" => "--name",
        "--sort" => "--sort",
        "--search" => "--search",
        _ => "--out",
    }
}

fn take_opt(flags: &mut Vec<(String, Option<String>)>, flag: &str) -> Option<String> {
    let index = flags.iter().rposition(|(name, _)| name == flag)?;
    let value = flags.remove(index).1;
    flags.retain(|(name, _)| name != flag);
    value
}

fn take(
    flags: &mut Vec<(String, Option<String>)>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    take_opt(flags, flag)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ArgsError::MissingFlag { flag })
}

fn take_switch(flags: &mut Vec<(String, Option<String>)>, flag: &str) -> bool {
    let before = flags.len();
    flags.retain(|(name, _)| name != flag);
    flags.len() != before
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}
