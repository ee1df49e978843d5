//! Output record and sink traits
//!
//! This module defines the record emitted for every harvested hit and the
//! trait interface for the sinks that receive them.

use crate::search::{Hit, Query, Service};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// The downloaded content of a hit, or why it could not be downloaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Error { error: String },
}

impl Content {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// One finished output record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub service: Service,
    pub query: String,
    pub repo: String,
    pub path: String,
    pub content_url: String,
    pub content: Content,
}

impl Match {
    /// Builds the record for a hit of `query`
    pub fn new(query: &Query, hit: &Hit, content: Content) -> Self {
        Self {
            service: query.service,
            query: query.text.clone(),
            repo: hit.repo.clone(),
            path: hit.path.clone(),
            content_url: hit.content_url.clone(),
            content,
        }
    }
}

/// Trait for match sinks
///
/// A sink receives records in discovery order, each exactly once. A sink
/// failure aborts the crawl.
pub trait MatchSink {
    /// Records one match
    fn emit(&mut self, record: &Match) -> OutputResult<()>;

    /// Flushes anything buffered; called once after the last record
    fn finish(&mut self) -> OutputResult<()> {
        Ok(())
    }
}

/// Collects records in memory
impl MatchSink for Vec<Match> {
    fn emit(&mut self, record: &Match) -> OutputResult<()> {
        self.push(record.clone());
        Ok(())
    }
}
