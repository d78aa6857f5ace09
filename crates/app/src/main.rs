use quiz_core::model::{CourseCatalog, UserId};
use services::{AppConfig, AppServices, Clock};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod args;
mod quiz;
mod render;

use args::{Args, ArgsError, Command, print_usage};

fn init_tracing(rust_log: &str) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("logs", "quizdeck.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_new(rust_log).unwrap_or_else(|_| EnvFilter::new("info"));
    // The terminal belongs to the quiz; console logs go to stderr.
    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
    guard
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    if parsed.command == Command::Help {
        print_usage();
        return Ok(());
    }

    let mut config = AppConfig::from_env()?;
    if let Some(db_url) = parsed.db_url {
        config.database_url = db_url;
    }
    let _guard = init_tracing(&config.rust_log);

    // Open + migrate SQLite at startup. Keep this in the binary glue so services stay pure.
    prepare_sqlite_file(&config.database_url)?;
    let app = AppServices::new_sqlite(&config, Clock::default()).await?;
    tracing::debug!(db = %config.database_url, "services ready");

    match parsed.command {
        Command::Quiz(args) => quiz::run(&app, args).await,
        Command::Leaderboard(args) => {
            let leaderboard = app.leaderboard();
            match args.course {
                Some(course) => {
                    let course = CourseCatalog::default().resolve(&course)?;
                    let rows = leaderboard
                        .course(&course, args.sort, args.search.as_deref())
                        .await?;
                    render::ranked_board(&course, &rows);
                }
                None => {
                    let boards = leaderboard
                        .all_courses(args.sort, args.search.as_deref())
                        .await?;
                    render::all_boards(&boards);
                }
            }
            Ok(())
        }
        Command::Plan { user } => {
            let user = UserId::new(user)?;
            match app.results().plan_for(&user).await? {
                Some(plan) => render::stored_plan(&plan),
                None => println!("No study plan stored for {user}."),
            }
            Ok(())
        }
        Command::Export { out } => {
            let count =
                services::export::export_attempts_to_file(app.attempts().as_ref(), &out)
                    .await?;
            println!("Exported {count} attempts to {}.", out.display());
            Ok(())
        }
        Command::Help => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
