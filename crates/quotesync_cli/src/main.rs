//! `quotesync` command-line front end.
//!
//! # Responsibility
//! - Wire durable/session storage, remote client and clock into a store.
//! - Expose store operations as one-shot subcommands and an interactive
//!   session with background periodic sync.

use clap::{Parser, Subcommand};
use log::info;
use quotesync_core::config::DEFAULT_ENDPOINT;
use quotesync_core::{
    default_log_level, init_logging, Capabilities, HttpRemoteClient, LogTarget,
    MemoryKeyValueStore, OfflineRemote, QuoteStore, RemoteClient, Resolution,
    SqliteKeyValueStore, SyncConfig, SyncOutcome, SyncReport, SyncScheduler, SystemClock,
    EXPORT_FILE_NAME,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "quotesync", version, about = "Random quote store with remote sync")]
struct Cli {
    /// SQLite file holding durable quote data.
    #[arg(long, env = "QUOTESYNC_DB", default_value = "quotesync.sqlite3")]
    db: PathBuf,

    /// Base URL of the posts endpoint.
    #[arg(long, env = "QUOTESYNC_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Seconds between background sync cycles in `run`.
    #[arg(long, default_value_t = 30)]
    interval_secs: u64,

    /// Never contact the remote; quotes stay local.
    #[arg(long)]
    offline: bool,

    #[arg(long, env = "QUOTESYNC_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for log files; logs go to stderr when unset.
    #[arg(long, env = "QUOTESYNC_LOG_DIR")]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a random quote, optionally restricted to one category.
    Show {
        #[arg(long)]
        category: Option<String>,
    },
    /// List category selectors.
    Categories,
    /// Add a quote and register it with the remote.
    Add { text: String, category: String },
    /// Write all quotes as JSON.
    Export {
        #[arg(long, default_value = EXPORT_FILE_NAME)]
        out: PathBuf,
    },
    /// Import quotes from a JSON file.
    Import { file: PathBuf },
    /// Run one sync cycle.
    Sync,
    /// Interactive session with periodic background sync.
    Run,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = setup_logging(&cli) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(cli: &Cli) -> Result<(), String> {
    let (target, fallback_level) = match cli.log_dir.as_deref() {
        Some(dir) => (LogTarget::directory(dir)?, default_log_level()),
        None => (LogTarget::Stderr, "warn"),
    };
    let level = cli.log_level.as_deref().unwrap_or(fallback_level);
    init_logging(level, target)
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = SyncConfig {
        endpoint: cli.endpoint.clone(),
        interval: Duration::from_secs(cli.interval_secs),
        ..SyncConfig::default()
    };
    config.validate()?;

    let store = Arc::new(open_store(&cli.db, &config, cli.offline)?);
    let mut notices = store.subscribe();

    match cli.command {
        Command::Show { category } => {
            let selector = category.unwrap_or_else(|| store.last_category_filter());
            println!("{}", store.filter_and_pick(&selector).await);
        }
        Command::Categories => {
            for category in store.categories().await {
                println!("{category}");
            }
        }
        Command::Add { text, category } => {
            let quote = store.add_quote(&text, &category).await?;
            println!("{}", quote.display_line());
        }
        Command::Export { out } => export_to(&store, &out).await?,
        Command::Import { file } => import_from(&store, &file).await?,
        Command::Sync => print_report(&store.sync().await),
        Command::Run => return interactive(store, &config, notices).await,
    }

    drain_notices(&mut notices);
    Ok(())
}

fn open_store(db: &Path, config: &SyncConfig, offline: bool) -> CliResult<QuoteStore> {
    let clock = Arc::new(SystemClock);
    let durable = Arc::new(SqliteKeyValueStore::open(db, clock.clone())?);
    let remote: Arc<dyn RemoteClient> = if offline {
        Arc::new(OfflineRemote)
    } else {
        Arc::new(HttpRemoteClient::new(config)?)
    };
    info!(
        "event=cli_open module=cli status=ok db={} offline={offline}",
        db.display()
    );

    let store = QuoteStore::open(
        Capabilities {
            durable,
            session: Arc::new(MemoryKeyValueStore::new()),
            remote,
            clock,
        },
        config.batch_limit,
    )?;
    Ok(store)
}

async fn export_to(store: &QuoteStore, out: &Path) -> CliResult<()> {
    let snapshot = store.export_snapshot().await?;
    tokio::fs::write(out, snapshot).await?;
    println!("exported to {}", out.display());
    Ok(())
}

async fn import_from(store: &QuoteStore, file: &Path) -> CliResult<()> {
    let bytes = tokio::fs::read(file).await?;
    let count = store.import_json(&bytes).await?;
    println!("imported {count} quote(s)");
    Ok(())
}

fn print_report(report: &SyncReport) {
    match &report.outcome {
        SyncOutcome::RemoteUnavailable(reason) => println!("sync failed: {reason}"),
        SyncOutcome::Synced | SyncOutcome::Conflicted => {
            println!(
                "sync applied {} change(s), {} conflict(s)",
                report.applied,
                report.conflicts.len()
            );
        }
    }
    for (index, conflict) in report.conflicts.iter().enumerate() {
        println!(
            "  conflict {}: local {} | server {}",
            index + 1,
            conflict.local.display_line(),
            conflict.server.display_line()
        );
    }
}

fn drain_notices(notices: &mut broadcast::Receiver<quotesync_core::Notification>) {
    while let Ok(notice) = notices.try_recv() {
        println!("{notice}");
    }
}

const HELP: &str = "commands:
  show [category]            random quote (last filter when omitted)
  categories                 list category selectors
  add <text> | <category>    add a quote
  sync                       sync now
  conflicts                  list outstanding conflicts
  resolve local|server       settle outstanding conflicts
  export [path]              write quotes.json
  import <path>              import quotes from a JSON file
  help                       this text
  quit                       leave the session";

async fn interactive(
    store: Arc<QuoteStore>,
    config: &SyncConfig,
    mut notices: broadcast::Receiver<quotesync_core::Notification>,
) -> CliResult<()> {
    let printer = tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(notice) => println!("{notice}"),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    let scheduler = SyncScheduler::spawn(store.clone(), config.interval);

    match store.last_viewed() {
        Some(line) => println!("{line}"),
        None => println!(
            "{}",
            store.filter_and_pick(&store.last_category_filter()).await
        ),
    }
    println!("type `help` for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        match handle_line(&store, &scheduler, line.trim()).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => println!("error: {err}"),
        }
    }

    scheduler.shutdown().await;
    printer.abort();
    Ok(())
}

/// Executes one session command; `Ok(false)` ends the session.
async fn handle_line(store: &QuoteStore, scheduler: &SyncScheduler, line: &str) -> CliResult<bool> {
    let (command, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(command, rest)| (command, rest.trim()));

    match command {
        "" => {}
        "quit" | "exit" => return Ok(false),
        "help" => println!("{HELP}"),
        "show" => {
            let selector = if rest.is_empty() {
                store.last_category_filter()
            } else {
                rest.to_string()
            };
            println!("{}", store.filter_and_pick(&selector).await);
        }
        "categories" => println!("{}", store.categories().await.join(", ")),
        "add" => {
            let (text, category) = rest.split_once('|').unwrap_or((rest, ""));
            let quote = store.add_quote(text, category).await?;
            println!("{}", quote.display_line());
        }
        "sync" => scheduler.trigger(),
        "conflicts" => {
            let conflicts = store.pending_conflicts().await;
            if conflicts.is_empty() {
                println!("no outstanding conflicts");
            }
            for (index, conflict) in conflicts.iter().enumerate() {
                println!(
                    "conflict {}: local {} | server {}",
                    index + 1,
                    conflict.local.display_line(),
                    conflict.server.display_line()
                );
            }
        }
        "resolve" => {
            let keep_local = match rest {
                "local" => true,
                "server" => false,
                other => return Err(format!("expected `local` or `server`, got `{other}`").into()),
            };
            if let Resolution::NothingToResolve = store.resolve_conflicts(keep_local).await {
                println!("nothing to resolve");
            }
        }
        "export" => {
            let out = if rest.is_empty() { EXPORT_FILE_NAME } else { rest };
            export_to(store, Path::new(out)).await?;
        }
        "import" => import_from(store, Path::new(rest)).await?,
        other => println!("unknown command `{other}`; type `help`"),
    }

    Ok(true)
}
