//! JSON code search page interpreter
//!
//! The secondary service answers with a plain JSON object per page:
//!
//! ```json
//! {"page": 0, "results": [{"repo": "...", "location": "/src", "filename": "a.c", "url": ".../view/1"}]}
//! ```
//!
//! Its ordering is stable and an empty `results` array marks the end, so no
//! classification or deduplication is needed. Asking for a page past the last
//! one the service is willing to serve makes it echo a different page number.

use crate::config::SecondaryServiceConfig;
use crate::search::Hit;
use crate::TrawlError;
use serde::Deserialize;

/// One page of the JSON search API
#[derive(Debug, Clone, Deserialize)]
pub struct SecondaryPayload {
    pub page: u32,
    pub results: Vec<SecondaryResult>,
}

/// One result of the JSON search API
#[derive(Debug, Clone, Deserialize)]
pub struct SecondaryResult {
    pub repo: String,
    pub location: String,
    pub filename: String,
    pub url: String,
}

impl SecondaryResult {
    /// Converts the result into a hit pointing at the raw file view
    pub fn into_hit(self) -> Hit {
        Hit::new(
            self.repo,
            format!("{}/{}", self.location, self.filename),
            self.url.replace("/view/", "/raw/"),
        )
    }
}

impl SecondaryPayload {
    /// Parses a page body
    pub fn parse(body: &[u8]) -> Result<Self, TrawlError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Checks that the service answered the page that was asked for
    pub fn ensure_page(&self, requested: u32) -> Result<(), TrawlError> {
        if self.page != requested {
            return Err(TrawlError::TooManyResults {
                requested,
                returned: self.page,
            });
        }
        Ok(())
    }

    pub fn is_last(&self) -> bool {
        self.results.is_empty()
    }

    pub fn into_hits(self) -> impl Iterator<Item = Hit> {
        self.results.into_iter().map(SecondaryResult::into_hit)
    }
}

/// Request builder for the JSON search service
#[derive(Debug, Clone)]
pub struct SecondaryService {
    search_url: String,
    per_page: u32,
}

impl SecondaryService {
    pub fn new(config: &SecondaryServiceConfig) -> Self {
        Self {
            search_url: format!("{}{}", config.base_url, config.search_path),
            per_page: config.per_page,
        }
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }

    /// Query parameters for one page of results (pages are numbered from 0)
    pub fn search_params(&self, query: &str, page: u32) -> Vec<(&'static str, String)> {
        vec![
            ("q", query.to_string()),
            ("per_page", self.per_page.to_string()),
            ("p", page.to_string()),
        ]
    }
}
