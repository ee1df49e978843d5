//! Content materializer: downloads the file behind each hit
//!
//! A hit whose content cannot be fetched still produces a record, carrying the
//! error instead of the text. Only a failure of the sink itself stops the
//! crawl.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::observer::CrawlObserver;
use crate::output::{Content, Match, MatchSink};
use crate::search::{Hit, Query};
use crate::TrawlError;

/// Counts for one batch of materialized hits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Materialized {
    pub emitted: usize,
    pub failures: usize,
}

/// Turns hits into finished matches
pub struct Materializer<'a> {
    fetcher: &'a Fetcher,
    observer: &'a dyn CrawlObserver,
}

impl<'a> Materializer<'a> {
    pub fn new(fetcher: &'a Fetcher, observer: &'a dyn CrawlObserver) -> Self {
        Self { fetcher, observer }
    }

    /// Fetches the content of every hit in order and emits one match each
    ///
    /// `offset` is the number of hits of this crawl already materialized, so
    /// progress is numbered across batches.
    pub async fn materialize(
        &self,
        query: &Query,
        hits: &[Hit],
        offset: usize,
        sink: &mut dyn MatchSink,
    ) -> Result<Materialized, TrawlError> {
        let mut report = Materialized::default();

        for (i, hit) in hits.iter().enumerate() {
            let index = offset + i + 1;
            self.observer.fetching_content(index, &hit.content_url);

            let content = match self.fetcher.get(&hit.content_url, &[], self.observer).await {
                Ok(page) => Content::Text(page.text().into_owned()),
                Err(e) => {
                    self.observer.content_failed(index, &hit.content_url, &e);
                    report.failures += 1;
                    Content::Error {
                        error: e.to_string(),
                    }
                }
            };

            sink.emit(&Match::new(query, hit, content))?;
            report.emitted += 1;
        }

        Ok(report)
    }
}
