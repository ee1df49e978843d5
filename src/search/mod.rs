//! Search service contracts
//!
//! This module describes what the crawler needs to know about a code search
//! service, and nothing about how the crawl is driven:
//! - The query and the services it can be sent to
//! - The normalized `Hit` a result link is reduced to
//! - The `SearchPage` capability that classifies a fetched page and extracts
//!   its candidate hits
//!
//! Each service's page format lives in its own submodule, so a change to a
//! service's markup touches exactly one file.

mod hit;
pub mod primary;
pub mod secondary;

pub use hit::{dedupe_key, Hit};
pub use primary::{HtmlSearchPage, PrimaryService};
pub use secondary::{SecondaryPayload, SecondaryResult, SecondaryService};

use crate::TrawlError;
use serde::Serialize;
use std::fmt;

/// The code search services a query can be sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    /// HTML search with unstable ordering and prose result counts
    #[value(alias = "github")]
    Primary,
    /// JSON search with stable ordering and an honest end-of-results signal
    #[value(alias = "searchcode")]
    Secondary,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

/// A search to harvest; immutable for the duration of a crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub service: Service,
    pub text: String,
}

impl Query {
    pub fn new(service: Service, text: impl Into<String>) -> Self {
        Self {
            service,
            text: text.into(),
        }
    }
}

/// What a search results page says about the search as a whole
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The service found this many results in total
    Found(u32),
    /// The service explicitly found nothing
    ZeroResults,
    /// The service timed out and the page may be incomplete
    PartialTimeout,
    /// The page no longer looks like what the classifier expects
    Ambiguous(String),
}

/// A fetched search page, interpreted for one service's page format
pub trait SearchPage {
    /// Classifies the page into exactly one crawl-control state
    fn classify(&self) -> Classification;

    /// Lazily yields the candidate hits linked from the page
    ///
    /// Only meaningful for pages classified as `Found`. Fails when the page
    /// structure that holds the results cannot be located.
    fn candidates(&self) -> Result<Box<dyn Iterator<Item = Hit> + '_>, TrawlError>;
}
