//! Progress reporting for a running crawl
//!
//! A crawl reports what it is doing through a `CrawlObserver` handed to it at
//! construction time. Observers only watch: nothing they do feeds back into
//! the crawl's decisions.

use crate::search::{Classification, Query};
use crate::TrawlError;
use std::time::Duration;

/// Receives progress notifications from one crawl
///
/// Every method has an empty default body so implementations only override
/// what they care about.
pub trait CrawlObserver: Send + Sync {
    fn search_started(&self, _query: &Query) {}

    /// A request is about to sleep before being retried
    fn backing_off(&self, _url: &str, _delay: Duration, _attempt: u32) {}

    /// A request eventually succeeded
    fn request_completed(&self, _url: &str, _elapsed: Duration, _backoffs: u32) {}

    fn page_classified(&self, _pass: u32, _page: u32, _classification: &Classification) {}

    /// A full pass over the result pages ended without converging
    fn pass_finished(&self, _pass: u32, _found: usize, _advertised: u32) {}

    /// About to download the content of hit number `index` (1-based)
    fn fetching_content(&self, _index: usize, _url: &str) {}

    /// Downloading a hit's content failed; the crawl carries on
    fn content_failed(&self, _index: usize, _url: &str, _error: &TrawlError) {}

    fn search_finished(&self, _query: &Query, _matches: usize) {}
}

/// Observer that reports progress through `tracing`
#[derive(Debug, Clone)]
pub struct TracingObserver {
    slow_request: Duration,
}

impl TracingObserver {
    /// Creates an observer that warns about requests slower than `slow_request`
    pub fn new(slow_request: Duration) -> Self {
        Self { slow_request }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

impl CrawlObserver for TracingObserver {
    fn search_started(&self, query: &Query) {
        tracing::info!("Searching for {:?} on {}", query.text, query.service);
    }

    fn backing_off(&self, url: &str, delay: Duration, attempt: u32) {
        tracing::debug!(
            "Backing off {:?} before retry #{} of {}",
            delay,
            attempt,
            url
        );
    }

    fn request_completed(&self, url: &str, elapsed: Duration, backoffs: u32) {
        if backoffs > 0 || elapsed > self.slow_request {
            tracing::warn!(
                "Slow request: {} took {:.1} sec with {} backoffs",
                url,
                elapsed.as_secs_f64(),
                backoffs
            );
        } else {
            tracing::trace!("Fetched {} in {:?}", url, elapsed);
        }
    }

    fn page_classified(&self, pass: u32, page: u32, classification: &Classification) {
        tracing::debug!("Pass {} page {}: {:?}", pass, page, classification);
    }

    fn pass_finished(&self, pass: u32, found: usize, advertised: u32) {
        tracing::info!(
            "Finished pass {}, but only found {} of {} hits; scanning again",
            pass,
            found,
            advertised
        );
    }

    fn fetching_content(&self, index: usize, url: &str) {
        tracing::debug!("Fetching file #{}: {}", index, url);
    }

    fn content_failed(&self, index: usize, url: &str, error: &TrawlError) {
        tracing::warn!("Failed to fetch file #{} ({}): {}", index, url, error);
    }

    fn search_finished(&self, query: &Query, matches: usize) {
        tracing::info!(
            "Finished search for {:?} on {}: {} matches",
            query.text,
            query.service,
            matches
        );
    }
}
