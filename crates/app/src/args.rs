use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use wall_core::CalendarPolicy;
use wall_core::model::{Category, ProtocolId, UserId};
use wall_core::progress::Timeframe;

pub const DEFAULT_DB: &str = "db.json";
pub const DEFAULT_USER: &str = "local";

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingCommand,
    UnknownCommand(String),
    UnknownArg(String),
    MissingProtocolId { command: &'static str },
    UnexpectedFlag { flag: &'static str, command: &'static str },
    InvalidDb { raw: String },
    InvalidUser { raw: String },
    InvalidProtocolId { raw: String },
    InvalidOffset { raw: String },
    InvalidWeekStart { raw: String },
    InvalidNow { raw: String },
    InvalidDate { raw: String },
    InvalidCategory { raw: String },
    InvalidTimeframe { raw: String },
    MissingNotes,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingCommand => write!(f, "missing command"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingProtocolId { command } => {
                write!(f, "{command} requires a protocol id")
            }
            ArgsError::UnexpectedFlag { flag, command } => {
                write!(f, "{flag} is not accepted by {command}")
            }
            ArgsError::InvalidDb { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value: {raw:?}"),
            ArgsError::InvalidProtocolId { raw } => write!(f, "invalid protocol id: {raw:?}"),
            ArgsError::InvalidOffset { raw } => {
                write!(f, "invalid --utc-offset value (minutes, -1439..=1439): {raw}")
            }
            ArgsError::InvalidWeekStart { raw } => {
                write!(f, "invalid --week-start value (sunday or monday): {raw}")
            }
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
            ArgsError::InvalidDate { raw } => {
                write!(f, "invalid --date value (expected YYYY-MM-DD): {raw}")
            }
            ArgsError::InvalidCategory { raw } => write!(f, "invalid --category value: {raw}"),
            ArgsError::InvalidTimeframe { raw } => {
                write!(f, "invalid --timeframe value (day, week or month): {raw}")
            }
            ArgsError::MissingNotes => write!(f, "notes requires --notes <text>"),
        }
    }
}

impl std::error::Error for ArgsError {}

/// Where the wall lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    JsonFile(PathBuf),
    Sqlite(String),
}

impl DbTarget {
    fn parse(raw: String) -> Result<Self, ArgsError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ArgsError::InvalidDb { raw });
        }
        if trimmed.starts_with("sqlite:") {
            Ok(Self::Sqlite(trimmed.to_string()))
        } else {
            Ok(Self::JsonFile(PathBuf::from(trimmed)))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Library {
        category: Option<Category>,
        author: Option<String>,
    },
    Wall,
    Add {
        id: ProtocolId,
    },
    Remove {
        id: ProtocolId,
    },
    Toggle {
        id: ProtocolId,
        date: Option<NaiveDate>,
        notes: Option<String>,
    },
    Notes {
        id: ProtocolId,
        date: Option<NaiveDate>,
        notes: String,
    },
    Stats {
        timeframe: Timeframe,
    },
    Purge,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Library { .. } => "library",
            Command::Wall => "wall",
            Command::Add { .. } => "add",
            Command::Remove { .. } => "remove",
            Command::Toggle { .. } => "toggle",
            Command::Notes { .. } => "notes",
            Command::Stats { .. } => "stats",
            Command::Purge => "purge",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub db: DbTarget,
    pub user: UserId,
    pub policy: CalendarPolicy,
    pub now: Option<DateTime<Utc>>,
    pub command: Command,
}

/// `None` means `--help` was requested.
pub type Parsed = Option<Args>;

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_offset(raw: String) -> Result<i32, ArgsError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| ArgsError::InvalidOffset { raw })
}

fn parse_week_start(raw: String) -> Result<Weekday, ArgsError> {
    CalendarPolicy::parse_week_start(&raw).map_err(|_| ArgsError::InvalidWeekStart { raw })
}

fn parse_user(raw: String) -> Result<UserId, ArgsError> {
    UserId::new(raw.clone()).map_err(|_| ArgsError::InvalidUser { raw })
}

fn parse_protocol_id(raw: String) -> Result<ProtocolId, ArgsError> {
    ProtocolId::new(raw.clone()).map_err(|_| ArgsError::InvalidProtocolId { raw })
}

/// Flags that only make sense for some commands.
#[derive(Default)]
struct CommandFlags {
    category: Option<Category>,
    author: Option<String>,
    date: Option<NaiveDate>,
    notes: Option<String>,
    timeframe: Option<Timeframe>,
}

impl CommandFlags {
    fn reject_all_but(&self, command: &'static str, allowed: &[&str]) -> Result<(), ArgsError> {
        let given = [
            ("--category", self.category.is_some()),
            ("--author", self.author.is_some()),
            ("--date", self.date.is_some()),
            ("--notes", self.notes.is_some()),
            ("--timeframe", self.timeframe.is_some()),
        ];
        match given
            .into_iter()
            .find(|(flag, set)| *set && !allowed.contains(flag))
        {
            Some((flag, _)) => Err(ArgsError::UnexpectedFlag { flag, command }),
            None => Ok(()),
        }
    }
}

impl Args {
    /// Parse process arguments, with `PROTOCOL_*` environment variables as defaults.
    pub fn from_env() -> Result<Parsed, ArgsError> {
        Self::parse(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    /// Parse `args`; `env` supplies defaults that flags override.
    pub fn parse(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Parsed, ArgsError> {
        let mut db = DbTarget::parse(env("PROTOCOL_DB").unwrap_or_else(|| DEFAULT_DB.into()))?;
        let mut user = parse_user(env("PROTOCOL_USER").unwrap_or_else(|| DEFAULT_USER.into()))?;
        let mut offset_minutes = env("PROTOCOL_UTC_OFFSET_MINUTES")
            .map(parse_offset)
            .transpose()?
            .unwrap_or(0);
        let mut week_start = env("PROTOCOL_WEEK_START")
            .map(parse_week_start)
            .transpose()?
            .unwrap_or(Weekday::Sun);
        let mut now: Option<DateTime<Utc>> = None;

        let mut flags = CommandFlags::default();
        let mut positional: Vec<String> = Vec::new();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => db = DbTarget::parse(require_value(&mut args, "--db")?)?,
                "--user" => user = parse_user(require_value(&mut args, "--user")?)?,
                "--utc-offset" => {
                    offset_minutes = parse_offset(require_value(&mut args, "--utc-offset")?)?;
                }
                "--week-start" => {
                    week_start = parse_week_start(require_value(&mut args, "--week-start")?)?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--category" => {
                    let value = require_value(&mut args, "--category")?;
                    flags.category = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidCategory { raw: value.clone() })?,
                    );
                }
                "--author" => flags.author = Some(require_value(&mut args, "--author")?),
                "--date" => {
                    let value = require_value(&mut args, "--date")?;
                    flags.date = Some(
                        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                            .map_err(|_| ArgsError::InvalidDate { raw: value.clone() })?,
                    );
                }
                "--notes" => flags.notes = Some(require_value(&mut args, "--notes")?),
                "--timeframe" => {
                    let value = require_value(&mut args, "--timeframe")?;
                    flags.timeframe = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidTimeframe { raw: value.clone() })?,
                    );
                }
                "--help" | "-h" => return Ok(None),
                other if other.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let policy = CalendarPolicy::from_offset_minutes(offset_minutes, week_start).map_err(
            |_| ArgsError::InvalidOffset {
                raw: offset_minutes.to_string(),
            },
        )?;

        let command = build_command(positional, flags)?;

        Ok(Some(Self {
            db,
            user,
            policy,
            now,
            command,
        }))
    }
}

fn build_command(positional: Vec<String>, flags: CommandFlags) -> Result<Command, ArgsError> {
    let mut positional = positional.into_iter();
    let name = positional.next().ok_or(ArgsError::MissingCommand)?;

    let mut take_id = |command: &'static str| {
        positional
            .next()
            .ok_or(ArgsError::MissingProtocolId { command })
            .and_then(parse_protocol_id)
    };

    let command = match name.as_str() {
        "library" => {
            flags.reject_all_but("library", &["--category", "--author"])?;
            Command::Library {
                category: flags.category,
                author: flags.author,
            }
        }
        "wall" => {
            flags.reject_all_but("wall", &[])?;
            Command::Wall
        }
        "add" => {
            flags.reject_all_but("add", &[])?;
            Command::Add {
                id: take_id("add")?,
            }
        }
        "remove" => {
            flags.reject_all_but("remove", &[])?;
            Command::Remove {
                id: take_id("remove")?,
            }
        }
        "toggle" => {
            flags.reject_all_but("toggle", &["--date", "--notes"])?;
            Command::Toggle {
                id: take_id("toggle")?,
                date: flags.date,
                notes: flags.notes,
            }
        }
        "notes" => {
            flags.reject_all_but("notes", &["--date", "--notes"])?;
            Command::Notes {
                id: take_id("notes")?,
                date: flags.date,
                notes: flags.notes.ok_or(ArgsError::MissingNotes)?,
            }
        }
        "stats" => {
            flags.reject_all_but("stats", &["--timeframe"])?;
            Command::Stats {
                timeframe: flags.timeframe.unwrap_or(Timeframe::Week),
            }
        }
        "purge" => {
            flags.reject_all_but("purge", &[])?;
            Command::Purge
        }
        _ => return Err(ArgsError::UnknownCommand(name)),
    };

    if let Some(extra) = positional.next() {
        return Err(ArgsError::UnknownArg(extra));
    }
    tracing::trace!(command = command.name(), "parsed command");
    Ok(command)
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  protocol-wall [global options] <command> [command options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  library [--category <c>] [--author <name>]   Browse the protocol library");
    eprintln!("  wall                                         Show tracked protocols");
    eprintln!("  add <id>                                     Track a library protocol");
    eprintln!("  remove <id>                                  Stop tracking a protocol");
    eprintln!("  toggle <id> [--date YYYY-MM-DD] [--notes t]  Check off or un-check a day");
    eprintln!("  notes <id> --notes <text> [--date YYYY-MM-DD]");
    eprintln!("  stats [--timeframe day|week|month]           Progress report (default: week)");
    eprintln!("  purge                                        Remove every tracked protocol");
    eprintln!();
    eprintln!("Global options:");
    eprintln!("  --db <path|sqlite url>   JSON file path or sqlite: URL (default: {DEFAULT_DB})");
    eprintln!("  --user <id>              User whose wall to use (default: {DEFAULT_USER})");
    eprintln!("  --utc-offset <minutes>   Local offset for day boundaries (default: 0)");
    eprintln!("  --week-start <day>       sunday or monday (default: sunday)");
    eprintln!("  --now <rfc3339>          Fixed current time for deterministic runs");
    eprintln!("  -h, --help               Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  PROTOCOL_DB, PROTOCOL_USER, PROTOCOL_UTC_OFFSET_MINUTES, PROTOCOL_WEEK_START");
    eprintln!("  RUST_LOG controls log output on stderr");
}
