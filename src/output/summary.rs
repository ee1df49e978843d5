//! End-of-crawl statistics

use crate::search::Query;
use std::fmt;
use std::time::Duration;

/// Summary statistics for one crawl
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlSummary {
    pub query: Query,

    /// Passes over the result pages (always 1 for the secondary service)
    pub passes: u32,

    /// Search result pages fetched, counting retries of the same page
    pub search_requests: u32,

    /// Result count the service advertised last, if it advertised one
    pub advertised: Option<u32>,

    /// Distinct hits collected
    pub hits: usize,

    /// Matches written to the sink
    pub matches: usize,

    /// Matches whose content could not be downloaded
    pub content_failures: usize,

    pub elapsed: Duration,
}

impl CrawlSummary {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            passes: 1,
            search_requests: 0,
            advertised: None,
            hits: 0,
            matches: 0,
            content_failures: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Fraction of matches that carry content, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.matches == 0 {
            return 0.0;
        }
        ((self.matches - self.content_failures) as f64 / self.matches as f64) * 100.0
    }
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} on {}: {} hits",
            self.query.text, self.query.service, self.hits
        )?;
        if let Some(advertised) = self.advertised {
            write!(f, " (advertised {})", advertised)?;
        }
        write!(
            f,
            ", {} passes, {} search requests, {} matches, {} content failures, {:.1} sec",
            self.passes,
            self.search_requests,
            self.matches,
            self.content_failures,
            self.elapsed.as_secs_f64()
        )
    }
}
