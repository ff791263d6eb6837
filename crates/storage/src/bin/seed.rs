use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;
use vocab_core::model::WordPairDraft;

/// Built-in starter dictionary: (source word, hint, target word).
const SAMPLE_DICTIONARY: &[(&str, Option<&str>, &str)] = &[
    ("house", Some("haʊs"), "дом"),
    ("cat", Some("kæt"), "кошка"),
    ("dog", Some("dɒɡ"), "собака"),
    ("water", Some("ˈwɔːtə"), "вода"),
    ("bread", Some("brɛd"), "хлеб"),
    ("apple", Some("ˈæpl"), "яблоко"),
    ("book", Some("bʊk"), "книга"),
    ("window", Some("ˈwɪndəʊ"), "окно"),
    ("friend", Some("frɛnd"), "друг"),
    ("city", Some("ˈsɪti"), "город"),
    ("tree", Some("triː"), "дерево"),
    ("sun", Some("sʌn"), "солнце"),
];

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    file: Option<PathBuf>,
    user: Option<String>,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("VOCAB_DB_URL").unwrap_or_else(|_| "sqlite:vocab.sqlite3".into());
        let mut file = std::env::var("VOCAB_SEED_FILE").ok().map(PathBuf::from);
        let mut user = std::env::var("VOCAB_SEED_USER").ok();
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--file" => {
                    file = Some(PathBuf::from(require_value(&mut args, "--file")?));
                }
                "--user" => {
                    user = Some(require_value(&mut args, "--user")?);
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            file,
            user,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:vocab.sqlite3)");
    eprintln!("  --file <path>             Dictionary file, one `word<TAB>hint<TAB>translation` per line");
    eprintln!("                            (built-in sample dictionary when omitted)");
    eprintln!("  --user <name>             Also make sure a user with this display name exists");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  VOCAB_DB_URL, VOCAB_SEED_FILE, VOCAB_SEED_USER");
}

/// Parses one dictionary line. Accepts `word<TAB>hint<TAB>translation` and
/// `word<TAB>translation`; blank lines and `#` comments yield `None`.
fn parse_line(line: &str) -> Option<(String, Option<String>, String)> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() || line.trim_start().starts_with('#') {
        return None;
    }
    let fields: Vec<&str> = line.split('\t').collect();
    match fields.as_slice() {
        [word, hint, translation] => Some((
            (*word).to_string(),
            Some((*hint).to_string()),
            (*translation).to_string(),
        )),
        [word, translation] => Some(((*word).to_string(), None, (*translation).to_string())),
        _ => None,
    }
}

fn load_entries(args: &Args) -> Result<Vec<(String, Option<String>, String)>, std::io::Error> {
    let Some(path) = &args.file else {
        return Ok(SAMPLE_DICTIONARY
            .iter()
            .map(|(word, hint, translation)| {
                (
                    (*word).to_string(),
                    hint.map(str::to_string),
                    (*translation).to_string(),
                )
            })
            .collect());
    };

    let contents = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for (number, line) in contents.lines().enumerate() {
        match parse_line(line) {
            Some(entry) => entries.push(entry),
            None if line.trim().is_empty() || line.trim_start().starts_with('#') => {}
            None => tracing::warn!(line = number + 1, "skipping malformed dictionary line"),
        }
    }
    Ok(entries)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let entries = load_entries(&args)?;
    let mut created = 0_u32;
    let mut existing = 0_u32;
    let mut rejected = 0_u32;
    for (word, hint, translation) in &entries {
        let draft = match WordPairDraft::new(word, translation, hint.as_deref()) {
            Ok(draft) => draft,
            Err(err) => {
                tracing::warn!(%word, error = %err, "skipping invalid dictionary entry");
                rejected += 1;
                continue;
            }
        };
        let (_, inserted) = storage.catalog.import_global_pair(&draft, now).await?;
        if inserted {
            created += 1;
        } else {
            existing += 1;
        }
    }

    if let Some(name) = &args.user {
        let user = storage.users.ensure_user(name, now).await?;
        tracing::info!(%user, name = %name, "seed user ready");
    }

    tracing::info!(created, existing, rejected, db = %args.db_url, "seeded global dictionary");
    println!(
        "Seeded {created} new global pairs ({existing} already present, {rejected} rejected) into {}",
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("storage=info,services=info")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
