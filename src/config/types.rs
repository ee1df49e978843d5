use serde::Deserialize;

/// Main configuration structure for Codetrawl
///
/// Every section has defaults, so an empty file (or no file at all) yields a
/// working configuration against the public services.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub primary: PrimaryServiceConfig,
    #[serde(default)]
    pub secondary: SecondaryServiceConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler (optional)
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact (optional)
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "codetrawl".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: String::new(),
            contact_email: String::new(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`, with the
    /// parenthesised part omitted when no contact details are configured.
    pub fn header_value(&self) -> String {
        let contact: Vec<String> = [
            (!self.contact_url.is_empty()).then(|| format!("+{}", self.contact_url)),
            (!self.contact_email.is_empty()).then(|| self.contact_email.clone()),
        ]
        .into_iter()
        .flatten()
        .collect();

        if contact.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} ({})",
                self.crawler_name,
                self.crawler_version,
                contact.join("; ")
            )
        }
    }
}

/// Request and backoff behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// First sleep after a rate-limited or dropped request (milliseconds)
    #[serde(rename = "initial-backoff-ms")]
    pub initial_backoff_ms: u64,

    /// Requests slower than this are reported as slow (seconds)
    #[serde(rename = "slow-request-secs")]
    pub slow_request_secs: u64,

    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 1000,
            slow_request_secs: 3,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

/// The HTML code search service with unstable result ordering
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PrimaryServiceConfig {
    /// Origin of the service; result links must live under it
    #[serde(rename = "base-url")]
    pub base_url: String,

    #[serde(rename = "search-path")]
    pub search_path: String,

    /// Prefix put in front of repository names in emitted records
    #[serde(rename = "repo-label")]
    pub repo_label: String,
}

impl Default for PrimaryServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://github.com".to_string(),
            search_path: "/search".to_string(),
            repo_label: "github".to_string(),
        }
    }
}

/// The JSON code search service with stable ordering
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecondaryServiceConfig {
    #[serde(rename = "base-url")]
    pub base_url: String,

    #[serde(rename = "search-path")]
    pub search_path: String,

    /// Results requested per page
    #[serde(rename = "per-page")]
    pub per_page: u32,
}

impl Default for SecondaryServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://searchcode.com".to_string(),
            search_path: "/api/codesearch_I".to_string(),
            per_page: 100,
        }
    }
}

/// Authenticated session settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Raw `Cookie` header sent with every request
    pub cookie: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Emit each match as soon as its hit is discovered instead of after the
    /// search has converged
    #[serde(rename = "stream-matches")]
    pub stream_matches: bool,
}
