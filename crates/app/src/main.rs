use std::fmt;

use quiz_core::model::{PracticeSessionId, QuestionSetId, UserId};
use services::{AppServices, Clock};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { name: &'static str },
    UnknownArg(String),
    InvalidId { name: &'static str, raw: String },
    InvalidCount { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { name } => write!(f, "missing <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { name, raw } => write!(f, "invalid {name}: {raw}"),
            ArgsError::InvalidCount { raw } => write!(f, "invalid --count value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app generate <prompt...> [--count <n>]");
    eprintln!("  app sets");
    eprintln!("  app show <set_id>");
    eprintln!("  app status <set_id>");
    eprintln!("  app practice <set_id>");
    eprintln!("  app results <set_id> <session_id>");
    eprintln!("  app stats");
    eprintln!("  app delete <set_id>");
    eprintln!("  app pin <set_id>");
    eprintln!("  app unpin <set_id>");
    eprintln!();
    eprintln!("Global options:");
    eprintln!("  --db <sqlite_url>   (default sqlite://quiz.sqlite3)");
    eprintln!("  --user <id>         (default 1)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_USER_ID, QUIZ_AI_API_KEY, QUIZ_AI_BASE_URL, QUIZ_AI_MODEL");
    eprintln!("  RUST_LOG (default info)");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Generate { prompt: String, count: Option<u8> },
    Sets,
    Show(QuestionSetId),
    Status(QuestionSetId),
    Practice(QuestionSetId),
    Results(QuestionSetId, PracticeSessionId),
    Stats,
    Delete(QuestionSetId),
    Pin(QuestionSetId),
    Unpin(QuestionSetId),
}

#[derive(Debug)]
struct Args {
    db_url: String,
    user_id: UserId,
    command: Command,
}

fn parse_id<T: std::str::FromStr>(
    positionals: &mut impl Iterator<Item = String>,
    name: &'static str,
) -> Result<T, ArgsError> {
    let raw = positionals
        .next()
        .ok_or(ArgsError::MissingArgument { name })?;
    raw.parse().map_err(|_| ArgsError::InvalidId { name, raw })
}

impl Args {
    fn parse(argv: impl IntoIterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url);
        let mut user_id = std::env::var("QUIZ_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok())
            .unwrap_or(UserId::new(1));
        let mut count = None;
        let mut positionals = Vec::new();

        let mut args = argv.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    user_id = value.parse().map_err(|_| ArgsError::InvalidId {
                        name: "--user",
                        raw: value.clone(),
                    })?;
                }
                "--count" => {
                    let value = require_value(&mut args, "--count")?;
                    let parsed: u8 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCount { raw: value.clone() })?;
                    count = Some(parsed);
                }
                "--help" | "-h" => return Ok(None),
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positionals.push(arg),
            }
        }

        let mut positionals = positionals.into_iter();
        let Some(name) = positionals.next() else {
            return Ok(None);
        };
        let command = match name.as_str() {
            "generate" => {
                let prompt = positionals.by_ref().collect::<Vec<_>>().join(" ");
                if prompt.trim().is_empty() {
                    return Err(ArgsError::MissingArgument { name: "prompt" });
                }
                Command::Generate { prompt, count }
            }
            "sets" => Command::Sets,
            "show" => Command::Show(parse_id(&mut positionals, "set_id")?),
            "status" => Command::Status(parse_id(&mut positionals, "set_id")?),
            "practice" => Command::Practice(parse_id(&mut positionals, "set_id")?),
            "results" => Command::Results(
                parse_id(&mut positionals, "set_id")?,
                parse_id(&mut positionals, "session_id")?,
            ),
            "stats" => Command::Stats,
            "delete" => Command::Delete(parse_id(&mut positionals, "set_id")?),
            "pin" => Command::Pin(parse_id(&mut positionals, "set_id")?),
            "unpin" => Command::Unpin(parse_id(&mut positionals, "set_id")?),
            _ => return Err(ArgsError::UnknownArg(name)),
        };

        if let Some(extra) = positionals.next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        Ok(Some(Self {
            db_url,
            user_id,
            command,
        }))
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if is_in_memory(&raw) || raw.starts_with("sqlite://") {
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

fn is_in_memory(db_url: &str) -> bool {
    db_url == "sqlite::memory:" || db_url.contains("mode=memory")
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if is_in_memory(db_url) {
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

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = match Args::parse(std::env::args().skip(1)) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e}");
            print_usage();
            return Err(e.into());
        }
    };

    // sqlx will not create a missing database file on its own.
    prepare_sqlite_file(&parsed.db_url)?;
    let app = AppServices::new_sqlite(&parsed.db_url, Clock::system()).await?;
    tracing::debug!(db = %parsed.db_url, user_id = %parsed.user_id, "services ready");

    commands::execute(&app, parsed.user_id, parsed.command).await
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
