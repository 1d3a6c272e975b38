//! Repo-Sync main entry point
//!
//! This is the command-line interface for the repossessed-listing catalog sync.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use repo_sync::config::{load_config_with_hash, Config};
use repo_sync::crawler::Coordinator;
use repo_sync::output::{print_reprocess_report, print_sync_report};
use repo_sync::registry::DirectusRegistry;
use repo_sync::SourceId;
use tracing_subscriber::EnvFilter;

/// Repo-Sync: keeps a catalog of bank-repossessed listings in sync
///
/// Discovers listing links on the bank websites, registers the new ones,
/// scrapes the detail pages that have not been captured yet, and re-validates
/// listings flagged as stale.
#[derive(Parser, Debug)]
#[command(name = "repo-sync")]
#[command(version = "1.0.0")]
#[command(about = "Repossessed-listing catalog sync", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Only sync these sources (repeatable); defaults to every enabled source
    #[arg(long = "source", value_name = "ID")]
    sources: Vec<SourceId>,

    /// Reprocess stale links instead of syncing catalogs
    #[arg(long, conflicts_with = "sources")]
    stale: bool,

    /// Validate config and show what would run without touching anything
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let sources = selected_sources(&config, &cli.sources);

    if cli.dry_run {
        handle_dry_run(&config, &sources, cli.stale);
        return Ok(());
    }

    let registry = DirectusRegistry::new(&config.registry).context("failed to build registry client")?;
    let coordinator = Coordinator::new(config, Arc::new(registry))?;

    if cli.stale {
        handle_stale(&coordinator).await
    } else {
        handle_sync(&coordinator, &sources).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("repo_sync=info,warn"),
            1 => EnvFilter::new("repo_sync=debug,info"),
            2 => EnvFilter::new("repo_sync=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Sources to sync: the `--source` flags, else the enabled `[[source]]` tables,
/// else every known source
fn selected_sources(config: &Config, requested: &[SourceId]) -> Vec<SourceId> {
    if !requested.is_empty() {
        let mut seen = HashSet::new();
        return requested.iter().copied().filter(|s| seen.insert(*s)).collect();
    }

    if config.sources.is_empty() {
        return SourceId::all();
    }

    config
        .enabled_sources()
        .filter_map(|entry| entry.source_id())
        .collect()
}

/// Handles the --dry-run mode: shows the settings that would be used
fn handle_dry_run(config: &Config, sources: &[SourceId], stale: bool) {
    println!("=== Repo-Sync Dry Run ===\n");

    println!("Registry:");
    println!("  URL: {}", config.registry.url);
    println!("  Timeout: {}s", config.registry.timeout_secs);
    println!("  Write retries: {}", config.registry.write_retries);

    println!("\nScraper:");
    println!("  Batch size: {}", config.scraper.batch_size);
    println!("  Page delay: {}ms", config.scraper.page_delay_ms);
    println!("  Listing timeout: {}s", config.scraper.listing_timeout_secs);
    println!("  Detail timeout: {}s", config.scraper.detail_timeout_secs);
    println!("  Max pages per entry point: {}", config.scraper.max_pages);

    println!("\nUser Agent: {}", config.http.user_agent);

    if stale {
        println!("\n✓ Configuration is valid");
        println!("✓ Would reprocess stale links for every source with a detail extractor");
        return;
    }

    println!("\nSources ({}):", sources.len());
    for source in sources {
        let entry = config.source_entry(*source);
        let base = entry
            .and_then(|e| e.base_url.as_deref())
            .unwrap_or("default");
        let cookies = entry.map(|e| e.cookies.len()).unwrap_or(0);
        println!("  - {} (base: {}, cookies: {})", source, base, cookies);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the default mode: one sync run per source, in order
///
/// A failed source does not stop the others; the command fails afterwards.
async fn handle_sync(coordinator: &Coordinator, sources: &[SourceId]) -> anyhow::Result<()> {
    let mut aborted = Vec::new();

    for source in sources {
        match coordinator.sync_source(*source).await {
            Ok(report) => print_sync_report(&format!("{} sync", source), &report),
            Err(e) => {
                tracing::error!("Sync of {} aborted: {}", source, e);
                aborted.push(source.to_string());
            }
        }
    }

    if !aborted.is_empty() {
        bail!("sync aborted for: {}", aborted.join(", "));
    }
    Ok(())
}

/// Handles the --stale mode
async fn handle_stale(coordinator: &Coordinator) -> anyhow::Result<()> {
    match coordinator.reprocess_stale().await {
        Ok(report) => {
            print_reprocess_report("Stale reprocessing", &report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Stale reprocessing aborted: {}", e);
            Err(e.into())
        }
    }
}
