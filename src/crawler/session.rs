//! Crawl state machine for services with unstable result ordering
//!
//! The service returns its results in an order that changes from request to
//! request, so walking pages 1..N once can miss hits: a hit sitting on page 3
//! while page 2 is requested may have moved to page 2 by the time page 3 is
//! requested. The only fix is to rescan from page 1 until the number of
//! distinct hits collected reaches the count the service advertises.
//!
//! Termination is therefore driven by count convergence, never by running out
//! of pages:
//!
//! ```text
//!             ┌────────── Next (cursor += 1) ──────────┐
//!             │                                         │
//!   fetch page(cursor) ──► classify ──► Found(n) ──► merge hits ──► n <= |hits| ──► Complete
//!             ▲               │                         │
//!             │               ├─ PartialTimeout ──► Retry (same cursor, 3 strikes)
//!             │               ├─ ZeroResults ─────► Complete (first page only)
//!             │               └─ Ambiguous ───────► error
//!             │                                         │
//!             └──── NewPass (cursor = 1) ◄── cursor == total_pages
//! ```
//!
//! The session assumes the advertised count stays put while it runs. If the
//! result set changes mid-crawl there is no guarantee it ever converges.

use crate::search::{Classification, Hit, Query, SearchPage};
use crate::TrawlError;
use std::collections::HashSet;

/// Results the service shows per page
pub const RESULTS_PER_PAGE: u32 = 10;

/// Largest result set the service lets a client page through
pub const MAX_HITS: u32 = 1000;

/// Back-to-back server-side timeouts tolerated on one page
pub const MAX_CONSECUTIVE_TIMEOUTS: u32 = 3;

/// What the crawl should do after a page has been taken into account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Fetch the next page of the current pass
    Next { page: u32 },
    /// The page timed out on the server; fetch it again
    Retry { page: u32, attempts: u32 },
    /// The last page of a pass was reached without converging; rescan from page 1
    NewPass {
        pass: u32,
        found: usize,
        advertised: u32,
    },
    /// Every advertised hit has been collected
    Complete,
}

/// Pagination cursor, dedup set and counters for one crawl
#[derive(Debug)]
pub struct CrawlSession {
    query: Query,
    hits: Vec<Hit>,
    seen: HashSet<String>,
    page_cursor: u32,
    consecutive_partial_timeouts: u32,
    pass_number: u32,
    advertised: Option<u32>,
}

impl CrawlSession {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            hits: Vec::new(),
            seen: HashSet::new(),
            page_cursor: 1,
            consecutive_partial_timeouts: 0,
            pass_number: 1,
            advertised: None,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// The page to fetch next (1-based)
    pub fn page_cursor(&self) -> u32 {
        self.page_cursor
    }

    pub fn pass_number(&self) -> u32 {
        self.pass_number
    }

    /// The most recently advertised result count
    pub fn advertised(&self) -> Option<u32> {
        self.advertised
    }

    /// Hits collected so far, in discovery order
    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    pub fn into_hits(self) -> Vec<Hit> {
        self.hits
    }

    /// Adds a hit unless one with the same dedup key is already held
    ///
    /// Returns whether the hit was new.
    pub fn insert(&mut self, hit: Hit) -> bool {
        if self.seen.contains(&hit.dedupe_key) {
            return false;
        }
        self.seen.insert(hit.dedupe_key.clone());
        self.hits.push(hit);
        true
    }

    fn converged(&self, advertised: u32) -> bool {
        advertised as usize <= self.hits.len()
    }

    /// Takes the page fetched at the current cursor into account
    ///
    /// Candidates are only extracted from the page once the classification
    /// says there is something left to find.
    pub fn advance(&mut self, page: &dyn SearchPage) -> Result<Step, TrawlError> {
        self.advance_classified(page.classify(), page)
    }

    /// Like `advance`, for a page the caller has already classified
    pub fn advance_classified(
        &mut self,
        classification: Classification,
        page: &dyn SearchPage,
    ) -> Result<Step, TrawlError> {
        match classification {
            Classification::Ambiguous(detail) => Err(TrawlError::AmbiguousCountSignal { detail }),

            Classification::ZeroResults => {
                if self.page_cursor == 1 && self.pass_number == 1 && self.hits.is_empty() {
                    self.advertised = Some(0);
                    Ok(Step::Complete)
                } else {
                    Err(TrawlError::AmbiguousCountSignal {
                        detail: format!(
                            "zero-results notice on page {} of pass {} after {} hits",
                            self.page_cursor,
                            self.pass_number,
                            self.hits.len()
                        ),
                    })
                }
            }

            Classification::PartialTimeout => {
                self.consecutive_partial_timeouts += 1;
                if self.consecutive_partial_timeouts >= MAX_CONSECUTIVE_TIMEOUTS {
                    return Err(TrawlError::PartialResults {
                        page: self.page_cursor,
                        attempts: self.consecutive_partial_timeouts,
                    });
                }
                Ok(Step::Retry {
                    page: self.page_cursor,
                    attempts: self.consecutive_partial_timeouts,
                })
            }

            Classification::Found(count) => {
                self.consecutive_partial_timeouts = 0;
                self.advertised = Some(count);

                if count > MAX_HITS {
                    return Err(TrawlError::TooManyHits { count });
                }

                // Already holding everything the service claims exists; the
                // rest of this page is not looked at.
                if self.converged(count) {
                    return Ok(Step::Complete);
                }

                for hit in page.candidates()? {
                    self.insert(hit);
                }

                if self.converged(count) {
                    return Ok(Step::Complete);
                }

                let total_pages = count.div_ceil(RESULTS_PER_PAGE);
                if self.page_cursor >= total_pages {
                    self.pass_number += 1;
                    self.page_cursor = 1;
                    Ok(Step::NewPass {
                        pass: self.pass_number,
                        found: self.hits.len(),
                        advertised: count,
                    })
                } else {
                    self.page_cursor += 1;
                    Ok(Step::Next {
                        page: self.page_cursor,
                    })
                }
            }
        }
    }
}
