//! Crawler module for harvesting code search results
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with backoff and retry
//! - The convergence-driven crawl session
//! - Content materialization into output records
//! - Overall crawl coordination and progress reporting

mod coordinator;
mod fetcher;
mod materializer;
mod observer;
mod session;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, Attempt, Backoff, FetchedPage, Fetcher};
pub use materializer::{Materialized, Materializer};
pub use observer::{CrawlObserver, TracingObserver};
pub use session::{CrawlSession, Step, MAX_CONSECUTIVE_TIMEOUTS, MAX_HITS, RESULTS_PER_PAGE};

use crate::config::Config;
use crate::output::{CrawlSummary, MatchSink};
use crate::search::Query;
use crate::TrawlError;
use std::sync::Arc;
use std::time::Duration;

/// Runs a complete crawl operation
///
/// This is the main entry point for harvesting a search. It will:
/// 1. Build the HTTP session from the configuration
/// 2. Page through the search results until the hit count converges
/// 3. Download the content of every distinct hit
/// 4. Emit one match per hit to `sink`
///
/// Progress is reported through `tracing`.
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl completed successfully
/// * `Err(TrawlError)` - Crawl failed
pub async fn trawl(
    config: Config,
    query: &Query,
    sink: &mut dyn MatchSink,
) -> Result<CrawlSummary, TrawlError> {
    let observer = Arc::new(TracingObserver::new(Duration::from_secs(
        config.fetcher.slow_request_secs,
    )));
    Coordinator::new(config, observer)?.run(query, sink).await
}
