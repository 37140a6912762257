//! Status-Crawler main entry point
//!
//! This is the command-line interface for the Status-Crawler batch fetcher.

use anyhow::Context;
use clap::Parser;
use status_crawler::config::{load_config, Config};
use status_crawler::crawler::{crawl, RunPaths};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Status-Crawler: a batch fetcher for public status pages
///
/// Reads one status identifier per line (optionally followed by a TAB and the
/// author handle), fetches every status page, and writes the embedded JSON
/// records ordered by identifier.
#[derive(Parser, Debug)]
#[command(name = "status-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A batch fetcher for public status pages", long_about = None)]
struct Cli {
    /// Input file with one `<id>[<TAB><handle>]` per line
    #[arg(long, value_name = "PATH")]
    data: PathBuf,

    /// Gzip-compressed output file for fetched records
    #[arg(long, value_name = "PATH")]
    output: PathBuf,

    /// Output file for input lines that could not be fetched
    #[arg(long, value_name = "PATH")]
    repair: Option<PathBuf>,

    /// Drop identifiers whose page redirects instead of following
    #[arg(long)]
    no_follow: bool,

    /// Path to TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Proxy URL for every request
    #[arg(long, value_name = "URL")]
    proxy: Option<String>,

    /// Write a markdown run summary to this file
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,

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

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;

    let mut paths = RunPaths::new(&cli.data, &cli.output);
    if let Some(repair) = &cli.repair {
        paths = paths.with_repair(repair);
    }
    if let Some(summary) = &cli.summary {
        paths = paths.with_summary(summary);
    }

    match crawl(config, paths).await {
        Ok(summary) => {
            tracing::info!(
                "Crawl completed in {:.2}s",
                summary.duration.as_secs_f64()
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Loads the optional configuration file and applies command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None => Config::default(),
    };

    if cli.no_follow {
        config.crawler.follow_redirects = false;
    }
    if let Some(proxy) = &cli.proxy {
        config.request.proxy = Some(proxy.clone());
    }

    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("status_crawler=info,warn"),
            1 => EnvFilter::new("status_crawler=debug,info"),
            2 => EnvFilter::new("status_crawler=trace,debug"),
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
