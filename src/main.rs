//! Codetrawl main entry point
//!
//! This is the command-line interface for the Codetrawl code search harvester.

use anyhow::Context;
use clap::Parser;
use codetrawl::config::{load_config_with_hash, validate, Config};
use codetrawl::crawler::trawl;
use codetrawl::{JsonLinesSink, Query, Service};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Codetrawl: harvests every result of a code search
///
/// Codetrawl pages through a rate-limited code search until it has collected
/// as many distinct hits as the service says exist, then downloads each file
/// and writes one JSON record per hit.
#[derive(Parser, Debug)]
#[command(name = "codetrawl")]
#[command(version)]
#[command(about = "Harvests the full result set of a code search", long_about = None)]
struct Cli {
    /// Service to search
    #[arg(value_enum, value_name = "SERVICE")]
    service: Service,

    /// Search query, passed to the service verbatim
    #[arg(value_name = "QUERY")]
    query: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Session cookie to search as a logged-in user
    #[arg(long, value_name = "COOKIE", env = "CODETRAWL_COOKIE", hide_env_values = true)]
    cookie: Option<String>,

    /// Write matches as they are discovered instead of after the search converges
    #[arg(long)]
    stream: bool,

    /// Write matches to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

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

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if cli.cookie.is_some() {
        config.session.cookie = cli.cookie.clone();
    }
    if cli.stream {
        config.output.stream_matches = true;
    }
    validate(&config).context("Invalid configuration")?;

    let writer: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut sink = JsonLinesSink::new(BufWriter::new(writer));

    let query = Query::new(cli.service, cli.query);
    match trawl(config, &query, &mut sink).await {
        Ok(summary) => {
            tracing::info!("Crawl completed: {}", summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout carries the match records.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("codetrawl=info,warn"),
            1 => EnvFilter::new("codetrawl=debug,info"),
            2 => EnvFilter::new("codetrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
