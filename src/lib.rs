//! Codetrawl: harvests the full result set of a code search
//!
//! This crate drives pagination against a rate-limited code search service,
//! deduplicates hits across an unstably ordered result stream, decides when the
//! search has converged, and then downloads the file behind every hit.

pub mod config;
pub mod crawler;
pub mod output;
pub mod search;

use thiserror::Error;

/// Main error type for Codetrawl operations
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error(
        "Search timed out on the server {attempts} times in a row on page {page}, \
         returning only partial results; try a less expensive query"
    )]
    PartialResults { page: u32, attempts: u32 },

    #[error("Too many hits: try a search with <= 1000 results (not {count})")]
    TooManyHits { count: u32 },

    #[error("Scraper out of date, ambiguous result count: {detail}")]
    AmbiguousCountSignal { detail: String },

    #[error("Scraper out of date, expected one results container on {url} but found {found}")]
    MissingResults { url: String, found: usize },

    #[error("Too many results: requested page {requested} but the service returned page {returned}")]
    TooManyResults { requested: u32, returned: u32 },

    #[error("Malformed search payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::{trawl, Coordinator, CrawlObserver, TracingObserver};
pub use output::{CrawlSummary, JsonLinesSink, Match, MatchSink};
pub use search::{Hit, Query, Service};
