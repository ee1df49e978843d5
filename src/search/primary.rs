//! HTML code search page interpreter
//!
//! The primary service renders its results as an HTML page. Its only signal
//! about the search as a whole is the prose in the result-count heading:
//!
//! | Heading says | Meaning |
//! |--------------|---------|
//! | "We've found 2,758 code results" | `Found(2758)` |
//! | "We couldn't find any code matching ..." | `ZeroResults` |
//! | "Showing 2,948 available code results" plus a potential-timeouts help link | `PartialTimeout` |
//!
//! Any other combination means the markup has drifted and is reported as
//! `Ambiguous`, never guessed at.
//!
//! Result links look like `<base>/<owner>/<name>/blob/<40 hex rev>/<path>`;
//! swapping `blob` for `raw` gives a URL serving the file content.

use crate::config::PrimaryServiceConfig;
use crate::crawler::FetchedPage;
use crate::search::{Classification, Hit, SearchPage};
use crate::{ConfigError, TrawlError};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static COUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"found (?P<count>[0-9,]+) code results").expect("count pattern should compile")
});

static PARTIAL_COUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Showing [0-9,]+ available code").expect("partial count pattern should compile")
});

static HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3").expect("heading selector should parse"));

static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("link selector should parse"));

static RESULTS_CONTAINER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#code_search_results > .code-list")
        .expect("results container selector should parse")
});

/// Help anchor linked from the count heading when the search timed out
const TIMEOUT_HELP_ANCHOR: &str = "searching-github#potential-timeouts";

/// The service has used both a typographic and a plain apostrophe here
const ZERO_RESULTS_NOTICES: [&str; 2] = [
    "We couldn\u{2019}t find any code matching",
    "We couldn't find any code matching",
];

/// Request builder and page interpreter for the HTML search service
#[derive(Debug, Clone)]
pub struct PrimaryService {
    base_url: String,
    search_url: String,
    repo_label: String,
    result_link: Regex,
}

impl PrimaryService {
    /// Builds the interpreter for the configured service origin
    ///
    /// The origin is normalized the way `Url::join` normalizes result links
    /// (lowercase host, no default port), or no link would ever match.
    pub fn new(config: &PrimaryServiceConfig) -> Result<Self, TrawlError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| {
                ConfigError::InvalidUrl(format!(
                    "Invalid primary base_url '{}': {}",
                    config.base_url, e
                ))
            })?
            .as_str()
            .trim_end_matches('/')
            .to_string();

        let pattern = format!(
            r"^{}/(?P<repo>.+?)/blob/(?P<rev>[0-9a-f]{{40}})/(?P<path>.+)$",
            regex::escape(&base_url)
        );
        let result_link = Regex::new(&pattern).map_err(|e| {
            ConfigError::Validation(format!(
                "Cannot build result link pattern for '{}': {}",
                base_url, e
            ))
        })?;

        Ok(Self {
            search_url: format!("{}{}", base_url, config.search_path),
            base_url,
            repo_label: config.repo_label.clone(),
            result_link,
        })
    }

    /// The search endpoint URL
    pub fn search_url(&self) -> &str {
        &self.search_url
    }

    /// Query parameters for one page of results (pages are numbered from 1)
    pub fn search_params(&self, query: &str, page: u32) -> Vec<(&'static str, String)> {
        vec![
            ("ref", "searchresults".to_string()),
            ("type", "Code".to_string()),
            ("q", query.to_string()),
            ("p", page.to_string()),
        ]
    }

    /// Parses a fetched search page
    pub fn interpret(&self, page: &FetchedPage) -> HtmlSearchPage<'_> {
        HtmlSearchPage::parse(self, &page.text(), page.url.clone())
    }

    /// Turns one result link into a hit, or `None` if it is not a result link
    ///
    /// Relative links are resolved against the page URL and fragments (links
    /// to specific lines) are discarded before matching.
    pub fn hit_from_link(&self, page_url: &Url, href: &str) -> Option<Hit> {
        let mut url = page_url.join(href).ok()?;
        url.set_fragment(None);

        let caps = self.result_link.captures(url.as_str())?;
        let repo = caps.name("repo")?.as_str();
        let rev = caps.name("rev")?.as_str();
        let path = caps.name("path")?.as_str();

        Some(Hit::new(
            format!("{}:{}", self.repo_label, repo),
            path,
            format!("{}/{}/raw/{}/{}", self.base_url, repo, rev, path),
        ))
    }
}

/// One parsed page of HTML search results
pub struct HtmlSearchPage<'a> {
    service: &'a PrimaryService,
    document: Html,
    page_url: Url,
}

impl<'a> HtmlSearchPage<'a> {
    pub fn parse(service: &'a PrimaryService, html: &str, page_url: Url) -> Self {
        Self {
            service,
            document: Html::parse_document(html),
            page_url,
        }
    }
}

/// Signals collected from the page's headings before deciding
#[derive(Debug, Default)]
struct HeadingSignals {
    counts: Vec<String>,
    zero_results: bool,
    timeout_link: bool,
    partial_count: bool,
}

impl HeadingSignals {
    fn collect(document: &Html) -> Self {
        let mut signals = Self::default();

        for heading in document.select(&HEADING) {
            let text = heading.text().collect::<String>();

            if links_of(heading).any(|href| href.contains(TIMEOUT_HELP_ANCHOR)) {
                signals.timeout_link = true;
            }
            if PARTIAL_COUNT_PATTERN.is_match(&text) {
                signals.partial_count = true;
            }
            if ZERO_RESULTS_NOTICES.iter().any(|notice| text.contains(notice)) {
                signals.zero_results = true;
            }
            signals.counts.extend(
                COUNT_PATTERN
                    .captures_iter(&text)
                    .filter_map(|caps| caps.name("count"))
                    .map(|m| m.as_str().to_string()),
            );
        }

        signals
    }

    fn decide(self) -> Classification {
        if self.timeout_link {
            if !self.counts.is_empty() || self.zero_results {
                return Classification::Ambiguous(format!(
                    "timeout notice alongside {} count string(s) and zero-results notice {}",
                    self.counts.len(),
                    self.zero_results
                ));
            }
            return Classification::PartialTimeout;
        }

        if self.partial_count {
            return Classification::Ambiguous(
                "partial result count without a timeout notice".to_string(),
            );
        }

        match (self.counts.as_slice(), self.zero_results) {
            ([count], false) => match count.replace(',', "").parse::<u32>() {
                Ok(count) => Classification::Found(count),
                Err(e) => Classification::Ambiguous(format!("unreadable count '{}': {}", count, e)),
            },
            ([], true) => Classification::ZeroResults,
            (counts, zero_results) => Classification::Ambiguous(format!(
                "found {} count strings {:?} and zero-results notice {}",
                counts.len(),
                counts,
                zero_results
            )),
        }
    }
}

fn links_of<'a>(element: ElementRef<'a>) -> impl Iterator<Item = &'a str> {
    element
        .select(&LINK)
        .filter_map(|link| link.value().attr("href"))
}

impl SearchPage for HtmlSearchPage<'_> {
    fn classify(&self) -> Classification {
        HeadingSignals::collect(&self.document).decide()
    }

    fn candidates(&self) -> Result<Box<dyn Iterator<Item = Hit> + '_>, TrawlError> {
        let containers: Vec<ElementRef<'_>> = self.document.select(&RESULTS_CONTAINER).collect();
        let container = match containers.as_slice() {
            [container] => *container,
            _ => {
                return Err(TrawlError::MissingResults {
                    url: self.page_url.to_string(),
                    found: containers.len(),
                })
            }
        };

        Ok(Box::new(links_of(container).filter_map(move |href| {
            self.service.hit_from_link(&self.page_url, href)
        })))
    }
}
