mod args;

use std::path::{Path, PathBuf};

use serde_json::json;
use services::{AppServices, Clock};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::args::{Args, ArgsError, Command, DbTarget, print_usage};

fn init_tracing() {
    // stdout carries the JSON result, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,storage=info,services=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// `sqlite:wall.db` and `sqlite://wall.db` both become an absolute
/// `sqlite://` URL. In-memory URLs pass through untouched.
fn normalize_sqlite_url(raw: &str) -> String {
    if raw == "sqlite::memory:" || raw.contains("mode=memory") {
        return raw.to_string();
    }

    let path_str = raw
        .strip_prefix("sqlite://")
        .or_else(|| raw.strip_prefix("sqlite:"))
        .unwrap_or(raw);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// The pool creates the database file itself but not its directory.
fn prepare_sqlite_dir(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDb {
            raw: db_url.to_string(),
        }
        .into());
    }

    if let Some(parent) = Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

async fn open_services(args: &Args, clock: Clock) -> Result<AppServices, Box<dyn std::error::Error>> {
    let services = match &args.db {
        DbTarget::JsonFile(path) => {
            AppServices::new_json_file(path.clone(), clock, args.policy).await?
        }
        DbTarget::Sqlite(raw) => {
            let url = normalize_sqlite_url(raw);
            prepare_sqlite_dir(&url)?;
            AppServices::new_sqlite(&url, clock, args.policy).await?
        }
    };
    Ok(services)
}

fn print_json(value: &impl serde::Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let Some(args) = Args::from_env()? else {
        print_usage();
        return Ok(());
    };

    let clock = args.now.map_or_else(Clock::default_clock, Clock::fixed);
    let services = open_services(&args, clock).await?;
    let user = &args.user;
    let wall = services.wall();

    match &args.command {
        Command::Library { category, author } => {
            let catalog = services.catalog();
            print_json(&json!({
                "categories": catalog.categories(),
                "authors": catalog.authors(),
                "protocols": catalog.filter(*category, author.as_deref()),
            }))
        }
        Command::Wall => {
            let protocols = wall.list(user).await?;
            let completed_today = wall.completed_today(user).await?;
            print_json(&json!({
                "protocols": protocols,
                "completedToday": completed_today,
            }))
        }
        Command::Add { id } => print_json(&wall.add_from_catalog(user, id).await?),
        Command::Remove { id } => {
            wall.remove(user, id).await?;
            print_json(&json!({ "removed": id }))
        }
        Command::Toggle { id, date, notes } => {
            print_json(&wall.toggle_completion(user, id, *date, notes.clone()).await?)
        }
        Command::Notes { id, date, notes } => {
            print_json(&wall.save_notes(user, id, *date, Some(notes.clone())).await?)
        }
        Command::Stats { timeframe } => {
            print_json(&services.progress().report(user, *timeframe).await?)
        }
        Command::Purge => {
            let removed = wall.purge(user).await?;
            print_json(&json!({ "removed": removed }))
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        if wants_usage(err.as_ref()) {
            print_usage();
        }
        std::process::exit(2);
    }
}

/// Invocation mistakes are followed by the usage text.
fn wants_usage(err: &(dyn std::error::Error + 'static)) -> bool {
    err.is::<ArgsError>()
}
