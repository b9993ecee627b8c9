//! Resource-Audit main entry point
//!
//! This is the command-line interface for the Resource-Audit crawler.

use anyhow::Context;
use clap::{Parser, Subcommand};
use resource_audit::config::{load_config_with_hash, Config};
use resource_audit::crawler::{crawl, CrawlRequest};
use resource_audit::output::{
    generate_markdown_summary, generate_summary, load_statistics, print_crawls, print_logs,
    print_resources, print_statistics,
};
use resource_audit::storage::{Ledger, SqliteLedger};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Resource-Audit: a website resource auditor
///
/// Resource-Audit crawls a site or a sitemap, records every page and
/// sub-resource it sees together with its HTTP status, and keeps the
/// results in a SQLite ledger for later inspection.
#[derive(Parser, Debug)]
#[command(name = "resource-audit")]
#[command(version = "0.1.0")]
#[command(about = "Audits the resources a website loads", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a site and record every resource it loads
    Crawl {
        /// Root URL, or the sitemap URL with --sitemap
        url: String,

        /// Maximum number of pages to process (defaults to the configured budget)
        #[arg(long)]
        max_pages: Option<usize>,

        /// Only follow links whose URL matches this keyword or pattern
        #[arg(long)]
        keyword: Option<String>,

        /// Treat the URL as a sitemap and seed the crawl from it
        #[arg(long)]
        sitemap: bool,
    },

    /// List recorded crawls, newest first
    Crawls,

    /// Show a crawl's progress log
    Logs {
        /// Crawl ID
        id: i64,
    },

    /// List the resources recorded for a crawl
    Resources {
        /// Crawl ID
        id: i64,

        /// Only show resources with status 0 or 400 and above
        #[arg(long)]
        broken: bool,
    },

    /// Write a markdown report for a crawl and print its statistics
    Report {
        /// Crawl ID
        id: i64,

        /// Report path (defaults to the configured report path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::Crawl {
            url,
            max_pages,
            keyword,
            sitemap,
        } => handle_crawl(&config, url, max_pages, keyword, sitemap).await,
        Command::Crawls => handle_crawls(&config),
        Command::Logs { id } => handle_logs(&config, id),
        Command::Resources { id, broken } => handle_resources(&config, id, broken),
        Command::Report { id, output } => handle_report(&config, id, output),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("resource_audit=info,warn"),
            1 => EnvFilter::new("resource_audit=debug,info"),
            2 => EnvFilter::new("resource_audit=trace,debug"),
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

fn open_ledger(config: &Config) -> anyhow::Result<SqliteLedger> {
    SqliteLedger::new(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open database {}", config.output.database_path))
}

/// Handles the crawl command: runs a crawl to completion
async fn handle_crawl(
    config: &Config,
    url: String,
    max_pages: Option<usize>,
    keyword: Option<String>,
    sitemap: bool,
) -> anyhow::Result<()> {
    let mut request =
        CrawlRequest::new(url).with_max_pages(max_pages.unwrap_or(config.crawler.max_pages));
    if let Some(keyword) = keyword {
        request = request.with_keyword(keyword);
    }
    if sitemap {
        request = request.from_sitemap();
    }

    let crawl_id = crawl(config, request).await?;

    let ledger = open_ledger(config)?;
    let record = ledger.get_crawl(crawl_id)?;
    println!("Crawl {} finished with status: {}", crawl_id, record.status);

    Ok(())
}

/// Handles the crawls command: lists every crawl
fn handle_crawls(config: &Config) -> anyhow::Result<()> {
    let ledger = open_ledger(config)?;
    print_crawls(&ledger.list_crawls()?);
    Ok(())
}

/// Handles the logs command: prints one crawl's progress log
fn handle_logs(config: &Config, crawl_id: i64) -> anyhow::Result<()> {
    let ledger = open_ledger(config)?;
    ledger.get_crawl(crawl_id)?;
    print_logs(&ledger.get_logs(crawl_id)?);
    Ok(())
}

/// Handles the resources command: prints one crawl's resource rows
fn handle_resources(config: &Config, crawl_id: i64, broken_only: bool) -> anyhow::Result<()> {
    let ledger = open_ledger(config)?;
    ledger.get_crawl(crawl_id)?;
    print_resources(&ledger.get_resources(crawl_id)?, broken_only);
    Ok(())
}

/// Handles the report command: writes the markdown report
fn handle_report(config: &Config, crawl_id: i64, output: Option<PathBuf>) -> anyhow::Result<()> {
    let output = output.unwrap_or_else(|| PathBuf::from(&config.output.report_path));

    println!("=== Exporting Crawl Report ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", output.display());
    println!();

    let ledger = open_ledger(config)?;

    tracing::info!("Loading crawl {} from database...", crawl_id);
    let summary = generate_summary(&ledger, crawl_id)?;

    print_statistics(&load_statistics(&ledger, crawl_id)?);
    println!();

    tracing::info!("Generating markdown report...");
    generate_markdown_summary(&summary, &output)
        .with_context(|| format!("Failed to write report {}", output.display()))?;

    println!("✓ Report exported to: {}", output.display());

    Ok(())
}
