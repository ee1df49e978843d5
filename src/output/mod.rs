//! Output module for harvested matches
//!
//! This module defines:
//! - The `Match` record emitted for every distinct hit
//! - The `MatchSink` trait that records them
//! - A JSON Lines sink for files and stdout
//! - The end-of-crawl `CrawlSummary`

mod jsonl;
mod summary;
mod traits;

pub use jsonl::JsonLinesSink;
pub use summary::CrawlSummary;
pub use traits::{Content, Match, MatchSink, OutputError, OutputResult};
