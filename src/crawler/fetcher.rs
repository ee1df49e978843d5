//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests made by a crawl:
//! - Building the HTTP client for the (possibly authenticated) session
//! - Sending GET requests with query parameters
//! - Backing off and retrying on rate limiting and dropped connections
//! - Reporting slow requests to the crawl observer
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 2xx | Return the body |
//! | HTTP 429 | Sleep, double the delay, retry the same request |
//! | Connect error / timeout | Sleep, double the delay, retry the same request |
//! | Any other status | Fail immediately with `TrawlError::Http` |
//! | Any other client error | Fail immediately with `TrawlError::Request` |
//!
//! Retries are not capped: a service that rate-limits forever stalls the crawl
//! forever.

use crate::config::Config;
use crate::crawler::observer::CrawlObserver;
use crate::{ConfigError, TrawlError};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::{Client, Response, StatusCode};
use std::borrow::Cow;
use std::time::{Duration, Instant};
use url::Url;

/// A successfully fetched response body
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: Url,
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// The body as text, with invalid UTF-8 replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Builds the HTTP client for a crawl session
///
/// The session identifies itself with the configured user agent and, when a
/// cookie is configured, sends it with every request so that searches run as
/// a logged-in user (who is throttled less aggressively).
///
/// # Example
///
/// ```no_run
/// use codetrawl::config::Config;
/// use codetrawl::crawler::build_http_client;
///
/// let client = build_http_client(&Config::default()).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, TrawlError> {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = &config.session.cookie {
        let mut value = HeaderValue::from_str(cookie)
            .map_err(|e| ConfigError::Validation(format!("Invalid session cookie: {}", e)))?;
        value.set_sensitive(true);
        headers.insert(COOKIE, value);
    }

    let client = Client::builder()
        .user_agent(config.user_agent.header_value())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.fetcher.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.fetcher.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Exponential backoff schedule: the initial delay, doubling on every use
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    next: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(initial: Duration) -> Self {
        Self {
            initial,
            next: initial,
            attempts: 0,
        }
    }

    /// Returns the delay to sleep now and doubles the one after it
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = self.next.saturating_mul(2);
        self.attempts += 1;
        delay
    }

    /// Number of delays handed out since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.next = self.initial;
        self.attempts = 0;
    }
}

/// What to do after one attempt at a request
#[derive(Debug)]
pub enum Attempt {
    Success(Response),
    /// Sleep this long, then send the same request again
    Retry(Duration),
    Fatal(TrawlError),
}

impl Attempt {
    /// Decides the outcome of one sent request
    pub fn from_result(
        url: &str,
        result: Result<Response, reqwest::Error>,
        backoff: &mut Backoff,
    ) -> Self {
        match result {
            Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                Self::Retry(backoff.next_delay())
            }
            Ok(response) if !response.status().is_success() => Self::Fatal(TrawlError::Http {
                url: url.to_string(),
                status: response.status().as_u16(),
            }),
            Ok(response) => Self::Success(response),
            Err(e) if is_transient(&e) => Self::Retry(backoff.next_delay()),
            Err(e) => Self::Fatal(TrawlError::Request {
                url: url.to_string(),
                source: e,
            }),
        }
    }
}

/// Connection failures worth retrying
fn is_transient(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

/// Sends GET requests, retrying with backoff until they succeed or fail hard
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    initial_backoff: Duration,
}

impl Fetcher {
    pub fn new(client: Client, initial_backoff: Duration) -> Self {
        Self {
            client,
            initial_backoff,
        }
    }

    /// Builds a fetcher with the configured session and backoff
    pub fn from_config(config: &Config) -> Result<Self, TrawlError> {
        Ok(Self::new(
            build_http_client(config)?,
            Duration::from_millis(config.fetcher.initial_backoff_ms),
        ))
    }

    /// Fetches `url` with the given query parameters
    ///
    /// Every call starts from the initial backoff delay, so the schedule
    /// resets after each success.
    pub async fn get(
        &self,
        url: &str,
        params: &[(&str, String)],
        observer: &dyn CrawlObserver,
    ) -> Result<FetchedPage, TrawlError> {
        let start = Instant::now();
        let mut backoff = Backoff::new(self.initial_backoff);

        loop {
            let sent = self.client.get(url).query(params).send().await;

            let delay = match Attempt::from_result(url, sent, &mut backoff) {
                Attempt::Success(response) => {
                    let final_url = response.url().clone();
                    match response.bytes().await {
                        Ok(body) => {
                            observer.request_completed(url, start.elapsed(), backoff.attempts());
                            return Ok(FetchedPage {
                                url: final_url,
                                body: body.to_vec(),
                            });
                        }
                        Err(e) if is_transient(&e) => backoff.next_delay(),
                        Err(e) => {
                            return Err(TrawlError::Request {
                                url: url.to_string(),
                                source: e,
                            })
                        }
                    }
                }
                Attempt::Retry(delay) => delay,
                Attempt::Fatal(error) => return Err(error),
            };

            observer.backing_off(url, delay, backoff.attempts());
            tokio::time::sleep(delay).await;
        }
    }
}
