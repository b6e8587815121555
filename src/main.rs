//! SiteGauge main entry point
//!
//! This is the command-line interface for the SiteGauge crawlability auditor.

use anyhow::Context;
use clap::Parser;
use sitegauge::clock::SystemClock;
use sitegauge::cluster::diff;
use sitegauge::config::{load_config_with_hash, Config};
use sitegauge::crawler::{Coordinator, CrawlBudget, HttpFetcher};
use sitegauge::output::{generate_markdown_report, print_history, print_report};
use sitegauge::storage::{open_storage, SnapshotStore};
use sitegauge::url::canonicalize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

/// SiteGauge: a crawlability and content-structure auditor
///
/// SiteGauge crawls one site under a small page budget, reports indexability
/// and AI crawler visibility, and groups pages into templates so site-wide
/// defects stand out.
#[derive(Parser, Debug)]
#[command(name = "sitegauge")]
#[command(version)]
#[command(about = "A crawlability and template auditor", long_about = None)]
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

    /// Validate config and show what would be audited without crawling
    #[arg(long, conflicts_with = "history")]
    dry_run: bool,

    /// Show stored cluster snapshots for the site and exit
    #[arg(long, conflicts_with = "dry_run")]
    history: bool,

    /// Override the configured page budget (clamped to 5..=50)
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.history {
        handle_history(&config)
    } else {
        handle_audit(config, config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitegauge=info,warn"),
            1 => EnvFilter::new("sitegauge=debug,info"),
            2 => EnvFilter::new("sitegauge=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be audited
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let budget = CrawlBudget::from_config(&config.crawler);

    println!("=== SiteGauge Dry Run ===\n");

    println!("Site:");
    println!("  URL: {}", config.site.url);
    println!("  Known links: {}", config.site.known_links.len());

    println!("\nCrawler Configuration:");
    println!("  Max pages: {}", budget.max_pages());
    println!("  Max depth: {}", budget.max_depth());
    println!("  Seed link sample: {}", config.crawler.seed_link_sample);
    println!("  Fetch timeout: {}ms", config.crawler.fetch_timeout_ms);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);

    println!("\nRobots Matching:");
    println!("  Max pattern length: {}", config.robots.max_pattern_length);
    println!("  Regex size limit: {} bytes", config.robots.regex_size_limit);
    println!("  Cache TTL: {}s", config.robots.cache_ttl_secs);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    if config.ai_agents.is_empty() {
        println!("\nAI Agents: built-in defaults");
    } else {
        println!("\nAI Agents ({}):", config.ai_agents.len());
        for agent in &config.ai_agents {
            println!("  - {} ({})", agent.name, agent.token);
        }
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --history mode: shows stored snapshots and their diff
fn handle_history(config: &Config) -> anyhow::Result<()> {
    let site = Url::parse(&config.site.url).context("Invalid site URL")?;
    let origin = canonicalize(site.as_str(), &site)?
        .origin()
        .ascii_serialization();

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let history = storage.load_history(&origin)?;
    let deltas = diff(&history);

    print_history(&origin, &history, &deltas);

    if let Some(run) = storage.latest_run(&origin)? {
        println!(
            "\nLast run: {} ({}, {} pages)",
            run.started_at,
            run.status.to_db_string(),
            run.pages_crawled
        );
    }

    Ok(())
}

/// Handles the main audit operation
async fn handle_audit(config: Config, config_hash: String) -> anyhow::Result<()> {
    let timeout = Duration::from_millis(config.crawler.fetch_timeout_ms);
    let fetcher = HttpFetcher::from_config(&config.user_agent, timeout)
        .context("Failed to build HTTP client")?;
    let storage = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;
    let summary_path = PathBuf::from(&config.output.summary_path);

    let mut coordinator = Coordinator::new(
        config,
        Arc::new(fetcher),
        Box::new(storage),
        Arc::new(SystemClock),
    )
    .with_config_hash(config_hash);

    // Ctrl-C stops the crawl and keeps what was fetched so far
    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            cancel.cancel();
        }
    });

    let report = coordinator.run().await?;

    print_report(&report);
    generate_markdown_report(&report, &summary_path)?;
    tracing::info!("Summary written to {}", summary_path.display());

    Ok(())
}
