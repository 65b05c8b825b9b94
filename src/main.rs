use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stock_intake::{
    load_history_csv, CommandParser, DuplicateDetectionService, IntakeConfig, InMemoryHistoryStore,
    MovementAssembler, MovementHistoryStore, MovementKind, ParseResult, RuleCategoryClassifier,
    SqliteHistoryStore,
};

/// Command-line arguments for stock-intake
#[derive(Parser, Debug)]
#[command(name = "stock-intake")]
#[command(about = "Parse chat stock commands and flag likely duplicate entries")]
#[command(version)]
struct Args {
    /// TOML config file (defaults apply when omitted)
    #[arg(short, long, env = "STOCK_INTAKE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a command and print the result as JSON
    Parse {
        /// Command text; read from stdin when omitted
        text: Option<String>,

        /// Movement kind (in, out, adjust); taken from the leading verb when omitted
        #[arg(short, long, value_parser = parse_kind)]
        kind: Option<MovementKind>,

        /// Also print the assembled movements
        #[arg(long)]
        assemble: bool,

        /// Recorder used when no logged_by parameter is given
        #[arg(long, default_value = "cli")]
        logged_by: String,

        /// JSON category rules (built-in keywords when omitted)
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Parse a command and look for duplicates in recent history
    Check {
        /// Command text; read from stdin when omitted
        text: Option<String>,

        /// History source: a .csv file or a SQLite database
        #[arg(long, env = "STOCK_INTAKE_HISTORY")]
        history: PathBuf,

        #[arg(short, long, value_parser = parse_kind)]
        kind: Option<MovementKind>,
    },

    /// Load a history CSV into a SQLite database
    ImportHistory {
        csv: PathBuf,
        db: PathBuf,
    },
}

fn parse_kind(raw: &str) -> std::result::Result<MovementKind, String> {
    MovementKind::from_verb(raw).ok_or_else(|| format!("unknown movement kind '{}' (use in, out or adjust)", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stock_intake=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = IntakeConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command {
        Command::Parse {
            text,
            kind,
            assemble,
            logged_by,
            rules,
        } => run_parse(&config, text, kind, assemble, &logged_by, rules.as_deref()),
        Command::Check { text, history, kind } => run_check(&config, text, &history, kind).await,
        Command::ImportHistory { csv, db } => run_import(&csv, &db),
    }
}

fn command_text(text: Option<String>) -> Result<String> {
    match text {
        Some(t) => Ok(t),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read command from stdin")?;
            Ok(buf)
        }
    }
}

fn parse_text(parser: &CommandParser, text: &str, kind: Option<MovementKind>) -> Result<ParseResult> {
    match kind {
        Some(kind) => Ok(parser.parse(text, kind)),
        None => Ok(parser.parse_command(text)?),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_parse(
    config: &IntakeConfig,
    text: Option<String>,
    kind: Option<MovementKind>,
    assemble: bool,
    logged_by: &str,
    rules: Option<&Path>,
) -> Result<()> {
    let text = command_text(text)?;
    let parser = CommandParser::from_config(&config.parser);
    let result = parse_text(&parser, &text, kind)?;

    print_json(&result)?;
    eprintln!("{}", result.summary());

    if assemble && result.is_valid {
        let classifier = match rules {
            Some(path) => RuleCategoryClassifier::from_file(path)?,
            None => RuleCategoryClassifier::with_default_rules(),
        };
        let movements = MovementAssembler::new()
            .with_classifier(Arc::new(classifier))
            .assemble(&result, logged_by)?;
        print_json(&movements)?;
    }

    Ok(())
}

async fn run_check(
    config: &IntakeConfig,
    text: Option<String>,
    history: &Path,
    kind: Option<MovementKind>,
) -> Result<()> {
    let text = command_text(text)?;
    let parser = CommandParser::from_config(&config.parser);
    let result = parse_text(&parser, &text, kind)?;

    if !result.is_valid {
        print_json(&result)?;
        bail!("Command has errors: {}", result.error_messages().join("; "));
    }

    let is_csv = history
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        let store = InMemoryHistoryStore::from_csv(history)
            .with_context(|| format!("Failed to load history from {}", history.display()))?;
        check_with(DuplicateDetectionService::from_config(store, config), &result).await
    } else {
        let store = SqliteHistoryStore::open(history)
            .with_context(|| format!("Failed to open history database {}", history.display()))?;
        check_with(DuplicateDetectionService::from_config(store, config), &result).await
    }
}

async fn check_with<S: MovementHistoryStore>(
    service: DuplicateDetectionService<S>,
    result: &ParseResult,
) -> Result<()> {
    let detection = service.check_parse_result(result).await;
    print_json(&detection)?;

    if detection.requires_confirmation {
        eprintln!(
            "⚠️  {} possible duplicate(s) across {} entr(y/ies); confirm or cancel each",
            detection.candidates.len(),
            detection.entries.len()
        );
    } else {
        eprintln!("✓ No duplicates found");
    }
    Ok(())
}

fn run_import(csv_path: &Path, db_path: &Path) -> Result<()> {
    let movements = load_history_csv(csv_path)
        .with_context(|| format!("Failed to read {}", csv_path.display()))?;
    info!(count = movements.len(), "loaded history CSV");

    let store = SqliteHistoryStore::open(db_path)
        .with_context(|| format!("Failed to open {}", db_path.display()))?;
    let inserted = store.insert_movements(&movements)?;
    let total = store.count()?;

    eprintln!("✓ Imported {} new movements ({} skipped)", inserted, movements.len() - inserted);
    eprintln!("✓ Database contains {} movements", total);
    Ok(())
}
