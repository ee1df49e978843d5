//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives one search from the first results page to the last
//! emitted match:
//! - Fetching search pages through the rate-limited fetcher
//! - Feeding interpreted pages to the crawl session until it converges
//! - Materializing hits, either after convergence or after every page
//! - Reporting progress to the observer and totals in a `CrawlSummary`

use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::materializer::{Materialized, Materializer};
use crate::crawler::observer::CrawlObserver;
use crate::crawler::session::{CrawlSession, Step, MAX_CONSECUTIVE_TIMEOUTS};
use crate::output::{CrawlSummary, MatchSink};
use crate::search::{
    Hit, PrimaryService, Query, SearchPage, SecondaryPayload, SecondaryService, Service,
};
use crate::TrawlError;
use std::sync::Arc;
use std::time::Instant;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    fetcher: Fetcher,
    primary: PrimaryService,
    secondary: SecondaryService,
    observer: Arc<dyn CrawlObserver>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// The configuration is validated again here, since it may have been
    /// built or modified in code rather than loaded from a file.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `observer` - Receives progress notifications for every crawl run
    pub fn new(config: Config, observer: Arc<dyn CrawlObserver>) -> Result<Self, TrawlError> {
        crate::config::validate(&config)?;

        let fetcher = Fetcher::from_config(&config)?;
        let primary = PrimaryService::new(&config.primary)?;
        let secondary = SecondaryService::new(&config.secondary);

        Ok(Self {
            config,
            fetcher,
            primary,
            secondary,
            observer,
        })
    }

    /// Harvests every result of `query` into `sink`
    ///
    /// The sink is flushed whether or not the crawl succeeds; in streaming
    /// mode a failed crawl may already have emitted some matches.
    pub async fn run(
        &self,
        query: &Query,
        sink: &mut dyn MatchSink,
    ) -> Result<CrawlSummary, TrawlError> {
        let start = Instant::now();
        let mut summary = CrawlSummary::new(query.clone());
        self.observer.search_started(query);

        let outcome = match query.service {
            Service::Primary => self.run_primary(query, sink, &mut summary).await,
            Service::Secondary => self.run_secondary(query, sink, &mut summary).await,
        };
        let finished = sink.finish();
        outcome?;
        finished?;

        summary.elapsed = start.elapsed();
        self.observer.search_finished(query, summary.matches);
        Ok(summary)
    }

    fn streaming(&self) -> bool {
        self.config.output.stream_matches
    }

    async fn emit(
        &self,
        query: &Query,
        hits: &[Hit],
        offset: usize,
        sink: &mut dyn MatchSink,
        summary: &mut CrawlSummary,
    ) -> Result<(), TrawlError> {
        let Materialized { emitted, failures } =
            Materializer::new(&self.fetcher, self.observer.as_ref())
                .materialize(query, hits, offset, sink)
                .await?;
        summary.matches += emitted;
        summary.content_failures += failures;
        Ok(())
    }

    /// Multi-pass crawl of the HTML search service
    async fn run_primary(
        &self,
        query: &Query,
        sink: &mut dyn MatchSink,
        summary: &mut CrawlSummary,
    ) -> Result<(), TrawlError> {
        let mut session = CrawlSession::new(query.clone());
        let mut emitted = 0;

        loop {
            let pass = session.pass_number();
            let page_number = session.page_cursor();
            let params = self.primary.search_params(&query.text, page_number);
            let fetched = self
                .fetcher
                .get(self.primary.search_url(), &params, self.observer.as_ref())
                .await?;
            summary.search_requests += 1;

            // The parsed document is not Send; it must be gone before the
            // next await.
            let step = {
                let page = self.primary.interpret(&fetched);
                let classification = page.classify();
                self.observer
                    .page_classified(pass, page_number, &classification);
                session.advance_classified(classification, &page)
            };

            summary.passes = session.pass_number();
            summary.advertised = session.advertised();
            summary.hits = session.hits().len();
            let step = step?;

            if self.streaming() && session.hits().len() > emitted {
                let fresh = &session.hits()[emitted..];
                self.emit(query, fresh, emitted, sink, summary).await?;
                emitted = session.hits().len();
            }

            match step {
                Step::Next { .. } => {}
                Step::Retry { page, attempts } => {
                    tracing::warn!(
                        "Search timed out on page {} ({} of {} attempts); retrying",
                        page,
                        attempts,
                        MAX_CONSECUTIVE_TIMEOUTS
                    );
                }
                Step::NewPass {
                    pass,
                    found,
                    advertised,
                } => self.observer.pass_finished(pass - 1, found, advertised),
                Step::Complete => break,
            }
        }

        if session.hits().len() > emitted {
            let rest = &session.hits()[emitted..];
            self.emit(query, rest, emitted, sink, summary).await?;
        }

        Ok(())
    }

    /// Single-pass crawl of the JSON search service
    ///
    /// Pages are numbered from 0 and the first empty page ends the crawl.
    async fn run_secondary(
        &self,
        query: &Query,
        sink: &mut dyn MatchSink,
        summary: &mut CrawlSummary,
    ) -> Result<(), TrawlError> {
        let mut hits: Vec<Hit> = Vec::new();
        let mut emitted = 0;
        let mut page_index = 0;

        loop {
            let params = self.secondary.search_params(&query.text, page_index);
            let fetched = self
                .fetcher
                .get(self.secondary.search_url(), &params, self.observer.as_ref())
                .await?;
            summary.search_requests += 1;

            let payload = SecondaryPayload::parse(&fetched.body)?;
            payload.ensure_page(page_index)?;
            if payload.is_last() {
                tracing::debug!("Page {} is empty, no more results", page_index);
                break;
            }

            hits.extend(payload.into_hits());
            summary.hits = hits.len();
            tracing::debug!("Page {}: {} hits so far", page_index, hits.len());

            if self.streaming() {
                self.emit(query, &hits[emitted..], emitted, sink, summary)
                    .await?;
                emitted = hits.len();
            }

            page_index += 1;
        }

        if hits.len() > emitted {
            self.emit(query, &hits[emitted..], emitted, sink, summary)
                .await?;
        }

        Ok(())
    }
}
