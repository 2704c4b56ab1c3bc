//! Licitace-Watch main entry point
//!
//! This is the command-line interface for the flat-auction page watcher.
//! It is meant to be started by an external scheduler (cron, systemd timer).

use anyhow::Context;
use clap::Parser;
use licitace_watch::config::{load_config_with_hash, Config, NotifyTransport, StoreConfig};
use licitace_watch::notify::render::format_text_table;
use licitace_watch::storage::open_store;
use licitace_watch::watcher::{watch, Extractor};
use licitace_watch::{RunReport, RunStatus};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code used when the run could not save its snapshot
const EXIT_PARTIAL_FAILURE: u8 = 2;

/// Number of runs shown by --history
const HISTORY_LIMIT: usize = 20;

/// Licitace-Watch: a watcher for the municipal flat-auction page
///
/// Fetches the listing page, compares it with the last snapshot and sends a
/// notification when new auctions of the configured flat sizes appear.
#[derive(Parser, Debug)]
#[command(name = "licitace-watch")]
#[command(version)]
#[command(about = "Watches a flat-auction page for new listings", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Validate config and show what would be watched without fetching
    #[arg(long, conflicts_with_all = ["show_snapshot", "history", "extract"])]
    dry_run: bool,

    /// Print the stored snapshot and exit
    #[arg(long, conflicts_with_all = ["dry_run", "history", "extract"])]
    show_snapshot: bool,

    /// Print recent runs from the run log and exit
    #[arg(long, conflicts_with_all = ["dry_run", "show_snapshot", "extract"])]
    history: bool,

    /// Run the extractor on a local HTML file and exit
    #[arg(long, value_name = "HTML", conflicts_with_all = ["dry_run", "show_snapshot", "history"])]
    extract: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::debug!("Configuration loaded (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.show_snapshot {
        handle_show_snapshot(&config, cli.json).await?;
    } else if cli.history {
        handle_history(&config, cli.json).await?;
    } else if let Some(html_path) = &cli.extract {
        handle_extract(&config, html_path, cli.json)?;
    } else {
        return handle_run(&config, config_hash, cli.json).await;
    }

    Ok(ExitCode::SUCCESS)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("licitace_watch=info,warn"),
            1 => EnvFilter::new("licitace_watch=debug,info"),
            2 => EnvFilter::new("licitace_watch=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Licitace-Watch Dry Run ===\n");

    println!("Source:");
    println!("  URL: {}", config.source.url);
    println!("  Base URL: {}", config.source.effective_base_url());
    println!("  Unit selector: {}", config.source.unit_selector);
    println!("  Require link: {}", config.source.require_link);

    println!("\nUser Agent: {}", config.user_agent.user_agent_string());

    let sizes: Vec<&str> = config.watch.target_sizes.iter().collect();
    println!("\nWatch:");
    println!("  Target sizes: {}", sizes.join(", "));
    println!("  Notify on cold start: {}", config.watch.notify_on_cold_start);
    println!(
        "  Write snapshot on fetch failure: {}",
        config.watch.write_snapshot_on_fetch_failure
    );
    println!("  Lease: {}s", config.watch.lease_seconds);

    println!("\nStore:");
    match &config.store {
        StoreConfig::JsonFile { path } => println!("  JSON file: {}", path),
        StoreConfig::Sqlite { path, history } => {
            println!("  SQLite: {} (keeps {} snapshots)", path, history)
        }
    }

    println!("\nNotify ({}):", config.notify.transport.name());
    match &config.notify.transport {
        NotifyTransport::Log => {}
        NotifyTransport::MailDrop { directory } => println!("  Directory: {}", directory),
        NotifyTransport::Http {
            endpoint,
            api_key_env,
        } => {
            println!("  Endpoint: {}", endpoint);
            println!("  API key from: ${}", api_key_env);
        }
    }
    if !config.notify.to.is_empty() {
        println!("  From: {}", config.notify.from);
        println!("  To: {}", config.notify.to.join(", "));
    }
    println!("  Subject: {}", config.notify.subject);

    println!("\n✓ Configuration is valid");
}

/// Handles the --show-snapshot mode: prints the stored snapshot
async fn handle_show_snapshot(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = open_store(&config.store)?;

    match store.load().await? {
        None => println!("No snapshot stored at {}", config.store.path()),
        Some(records) if json => println!("{}", serde_json::to_string_pretty(&records)?),
        Some(records) => print!("{}", format_text_table(&records)),
    }

    Ok(())
}

/// Handles the --history mode: prints recent runs
async fn handle_history(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = open_store(&config.store)?;
    let runs = store.recent_runs(HISTORY_LIMIT).await?;

    if runs.is_empty() {
        println!("No runs recorded (the json-file store keeps no run log)");
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    for run in &runs {
        println!(
            "{}  {:<15}  current {:>3}  new {:>3}  email {}  {}",
            run.started_at,
            run.status.to_db_string(),
            run.current_count,
            run.new_count,
            if run.email_sent { "yes" } else { "no " },
            run.message
        );
    }

    Ok(())
}

/// Handles the --extract mode: runs the extractor on a local file
fn handle_extract(config: &Config, html_path: &Path, json: bool) -> anyhow::Result<()> {
    let html = std::fs::read_to_string(html_path)
        .with_context(|| format!("Failed to read {}", html_path.display()))?;
    let extractor = Extractor::from_config(&config.source)?;
    let records = extractor.extract(&html);

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        print!("{}", format_text_table(&records));
    }

    Ok(())
}

/// Handles the default mode: performs one run
async fn handle_run(config: &Config, config_hash: String, json: bool) -> anyhow::Result<ExitCode> {
    let report = watch(config, Some(config_hash)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_PARTIAL_FAILURE))
    }
}

fn print_summary(report: &RunReport) {
    println!("{}", report.message);
    if report.status == RunStatus::Skipped {
        return;
    }

    println!("  Current records: {}", report.current_count);
    println!("  Relevant new:    {}", report.new_count);
    println!(
        "  Notification:    {}",
        if report.notified() { "sent" } else { "not sent" }
    );

    for (label, error) in [
        ("Fetch error", &report.fetch_error),
        ("Notify error", &report.notify_error),
        ("Store error", &report.store_error),
    ] {
        if let Some(error) = error {
            println!("  {}: {}", label, error);
        }
    }
}
