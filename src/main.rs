//! Attendee-Harvest main entry point
//!
//! This is the command-line interface for the resumable attendee crawler.

use anyhow::Context;
use attendee_harvest::config::{load_config_with_hash, Config};
use attendee_harvest::crawler::{harvest, CookieSession, HarvestOptions};
use attendee_harvest::output::{load_statistics, print_report, print_statistics, write_csv};
use attendee_harvest::storage::open_history;
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Attendee-Harvest: a resumable event attendee crawler
///
/// Walks the attendee listing of every event, one page at a time, and
/// records each profile URL once. Progress is saved after every event, so
/// an interrupted session picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "attendee-harvest")]
#[command(version)]
#[command(about = "A resumable event attendee crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "harvest.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start from an empty history, ignoring previous progress
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "export"])]
    dry_run: bool,

    /// Show statistics from the history and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export"])]
    stats: bool,

    /// Rebuild the CSV export from the history and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.export {
        handle_export(&config)
    } else {
        handle_crawl(config, config_hash, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` takes precedence over the flags when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "attendee_harvest=info,warn",
            1 => "attendee_harvest=debug,info",
            2 => "attendee_harvest=trace,debug",
            _ => "trace",
        }
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the plan
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Attendee-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Empty pages before stopping: {}",
        config.crawler.max_consecutive_empty
    );
    println!("  Page retries: {}", config.crawler.page_retries);
    match config.crawler.max_pages {
        Some(max) => println!("  Max pages per event: {}", max),
        None => println!("  Max pages per event: unlimited"),
    }
    println!(
        "  Cooldown every: {} events",
        config.crawler.cooldown_every_n_parents
    );

    println!("\nPacing:");
    println!(
        "  Page delay: {}-{}ms",
        config.pacing.page_delay.min_ms, config.pacing.page_delay.max_ms
    );
    println!(
        "  Long pause: {}-{}ms every {} new profiles",
        config.pacing.pause_delay.min_ms,
        config.pacing.pause_delay.max_ms,
        config.pacing.pause_every_n_discoveries
    );

    println!("\nSource:");
    match &config.source.events_url {
        Some(url) => println!(
            "  Event listing: {} (timeout {}s)",
            url, config.source.discovery_timeout_secs
        ),
        None => println!("  Event listing: none (seeds only)"),
    }
    println!("  Attendee listing: {}", config.source.listing_url);
    println!(
        "  Profile links: {} containing '{}'",
        config.source.profile_selector, config.source.profile_href_contains
    );

    println!("\nSession:");
    println!("  Check URL: {}", config.session.check_url);

    println!("\nOutput:");
    println!("  History: {}", config.output.history_path);
    println!("  CSV: {}", config.output.csv_path);
    println!("  Log: {}", config.output.log_path);

    let (_, history) = open_history(Path::new(&config.output.history_path), false)
        .context("Failed to load history")?;
    let seeds = config.crawler.parents.len();

    println!("\nSeed Events ({}):", seeds);
    for seed in &config.crawler.parents {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ History holds {} processed events and {} profiles",
        history.processed_count(),
        history.child_count()
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the history
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("History: {}\n", config.output.history_path);

    let (_, history) = open_history(Path::new(&config.output.history_path), false)
        .context("Failed to load history")?;
    print_statistics(&load_statistics(&history));

    Ok(())
}

/// Handles the --export mode: rebuilds the CSV from the history
fn handle_export(config: &Config) -> anyhow::Result<()> {
    println!("=== Exporting Profiles ===\n");
    println!("History: {}", config.output.history_path);
    println!("Output: {}", config.output.csv_path);
    println!();

    let (_, history) = open_history(Path::new(&config.output.history_path), false)
        .context("Failed to load history")?;
    let rows = write_csv(&history, Path::new(&config.output.csv_path))
        .context("Failed to write CSV export")?;

    println!("✓ Exported {} profiles to: {}", rows, config.output.csv_path);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh harvest (ignoring previous history)");
    } else {
        tracing::info!("Starting harvest (resuming from history if present)");
    }

    let session = CookieSession::from_config(&config).context("Failed to load session")?;

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_interrupts(shutdown.clone()));

    let options = HarvestOptions {
        fresh,
        config_hash,
        shutdown,
    };

    let report = harvest(config, &session, options)
        .await
        .context("Harvest failed")?;

    print_report(&report);
    Ok(())
}

/// Exit status for a forced stop, as after SIGINT
const FORCED_EXIT_CODE: i32 = 130;

/// What to do about one Ctrl-C
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterruptAction {
    /// Stop after the current event
    Graceful,

    /// Exit immediately
    Force,
}

/// Cancels the token on the first interrupt and asks for a forced exit on
/// any later one
fn on_interrupt(shutdown: &CancellationToken) -> InterruptAction {
    if shutdown.is_cancelled() {
        InterruptAction::Force
    } else {
        shutdown.cancel();
        InterruptAction::Graceful
    }
}

/// First Ctrl-C stops after the current event; a second one exits at once
///
/// History is persisted after every event, so a forced exit loses at most
/// the event in flight.
async fn watch_interrupts(shutdown: CancellationToken) {
    loop {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for interrupts: {}", e);
            return;
        }

        match on_interrupt(&shutdown) {
            InterruptAction::Graceful => tracing::warn!(
                "Interrupt received, stopping after the current event (press Ctrl-C again to force)"
            ),
            InterruptAction::Force => {
                eprintln!("Second interrupt, exiting now");
                std::process::exit(FORCED_EXIT_CODE);
            }
        }
    }
}
