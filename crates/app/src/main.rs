use std::fmt;
use std::sync::Arc;

use exam_core::model::{AnswerId, SchoolId, Subject, SubjectId};
use services::{
    ApiConfig, Clock, Collaborators, HttpApi, SessionController, SessionState, StoredToken,
    SubjectLauncher,
};
use storage::{PositionStore, Storage};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    MissingApiUrl,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingApiUrl => write!(f, "EXAM_API_URL is not set"),
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

fn parse_id(args: &mut impl Iterator<Item = String>, flag: &'static str) -> Result<u64, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or(ArgsError::InvalidId { flag, raw: value })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app subjects --school <id> [--db <sqlite_url>] [--token <bearer>]");
    eprintln!("  app learn    --school <id> --subject <id> [--db <sqlite_url>] [--token <bearer>]");
    eprintln!();
    eprintln!("While learning, enter one command per line:");
    eprintln!("  n        next question");
    eprintln!("  p        previous question");
    eprintln!("  s <i>    jump to question i (1-based)");
    eprintln!("  a <id>   choose an answer");
    eprintln!("  f        finish");
    eprintln!("  q        quit");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_API_URL (required), EXAM_API_TIMEOUT_SECS, EXAM_DB_URL, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Subjects,
    Learn,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "subjects" => Some(Self::Subjects),
            "learn" => Some(Self::Learn),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    school_id: Option<SchoolId>,
    subject_id: Option<SubjectId>,
    token: Option<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("EXAM_DB_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| "sqlite://exam.sqlite3".into(), normalize_sqlite_url);
        let mut school_id = None;
        let mut subject_id = None;
        let mut token = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--school" => school_id = Some(SchoolId::new(parse_id(args, "--school")?)),
                "--subject" => subject_id = Some(SubjectId::new(parse_id(args, "--subject")?)),
                "--token" => token = Some(require_value(args, "--token")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            school_id,
            subject_id,
            token,
        })
    }

    fn school(&self) -> Result<SchoolId, ArgsError> {
        self.school_id
            .ok_or(ArgsError::MissingFlag { flag: "--school" })
    }

    fn subject(&self) -> Result<SubjectId, ArgsError> {
        self.subject_id
            .ok_or(ArgsError::MissingFlag { flag: "--subject" })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
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

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
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
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            ArgsError::UnknownArg(first.clone())
        })?,
    };

    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let api_config = ApiConfig::from_env().ok_or(ArgsError::MissingApiUrl)?;

    let storage = if parsed.db_url == "sqlite::memory:" {
        Storage::in_memory()
    } else {
        prepare_sqlite_file(&parsed.db_url)?;
        Storage::sqlite(&parsed.db_url).await?
    };

    let token = StoredToken::new(Arc::clone(&storage.kv));
    if let Some(raw) = parsed.token.as_deref() {
        token.save(raw).await?;
    }
    let api = HttpApi::new(&api_config, Arc::new(token))?;
    tracing::info!(base_url = %api.base_url(), db = %parsed.db_url, "backend configured");

    let launcher = SubjectLauncher::new(
        Clock::default_clock(),
        Collaborators::http(api),
        PositionStore::new(Arc::clone(&storage.kv)),
    );

    match cmd {
        Command::Subjects => {
            let subjects = launcher.subjects(parsed.school()?).await?;
            if subjects.is_empty() {
                println!("no subjects");
            }
            for subject in &subjects {
                print_subject(subject);
            }
            Ok(())
        }
        Command::Learn => {
            let school_id = parsed.school()?;
            let subject_id = parsed.subject()?;
            let subjects = launcher.subjects(school_id).await?;
            let Some(subject) = subjects.into_iter().find(|s| s.id() == subject_id) else {
                return Err(format!("subject {subject_id} not found in school {school_id}").into());
            };
            learn(&launcher, &subject).await
        }
    }
}

fn print_subject(subject: &Subject) {
    let marker = if subject.is_completed() { " (completed)" } else { "" };
    println!(
        "{:>4}  {}  {} questions  {:.0}%{marker}",
        subject.id().value(),
        subject.name(),
        subject.question_count(),
        subject.user_progress(),
    );
}

async fn learn(launcher: &SubjectLauncher, subject: &Subject) -> Result<(), Box<dyn std::error::Error>> {
    let launched = launcher.enter(subject).await?;
    let mut session = launched.controller;
    if launched.restarted {
        println!("{} was completed; starting over.", launched.subject.name());
    }
    render(&mut session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while !session.state().is_terminal() {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let mut words = line.split_whitespace();
        let result = match (words.next(), words.next()) {
            (Some("n"), None) => session.next().await.map(drop),
            (Some("p"), None) => session.prev().await.map(drop),
            (Some("f"), None) => session.finish().await,
            (Some("s"), Some(raw)) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => session.select(n - 1).await.map(drop),
                _ => {
                    eprintln!("expected a question number, got {raw}");
                    continue;
                }
            },
            (Some("a"), Some(raw)) => match raw.parse::<AnswerId>() {
                Ok(answer_id) => session.choose_answer(answer_id).map(|correct| {
                    println!("{}", if correct { "correct" } else { "incorrect" });
                }),
                Err(err) => {
                    eprintln!("{err}");
                    continue;
                }
            },
            (Some("q"), None) => break,
            (None, _) => continue,
            _ => {
                eprintln!("unknown command: {line}");
                continue;
            }
        };
        if let Err(err) = result {
            eprintln!("{err}");
        }
        render(&mut session);
    }

    session.close().await;
    Ok(())
}

fn render(session: &mut SessionController) {
    for notice in session.take_notices() {
        eprintln!("warning: {notice}");
    }

    let overview = session.overview();
    match session.state() {
        SessionState::Empty => {
            println!("This subject has no questions yet.");
            return;
        }
        SessionState::Finished { .. } => {
            println!(
                "Finished. {}/{} completed ({}%).",
                overview.completed, overview.total, overview.percent
            );
            return;
        }
        _ => {}
    }

    let Some(question) = session.current_question() else {
        return;
    };
    let position = overview.current_index.map_or(0, |i| i + 1);
    println!();
    println!(
        "[{position}/{}] {}% completed",
        overview.total, overview.percent
    );
    println!("{}", question.content);
    if let Some(hint) = &question.hint {
        println!("  hint: {hint}");
    }
    for answer in &question.answers {
        println!("  ({}) {}", answer.id, answer.content);
    }
    let mut actions = Vec::new();
    if overview.can_prev {
        actions.push("p");
    }
    if overview.can_next {
        actions.push("n");
    }
    if overview.can_finish {
        actions.push("f");
    }
    println!("  [{}]", actions.join(" "));
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
