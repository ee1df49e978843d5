use crate::config::types::{
    Config, FetcherConfig, PrimaryServiceConfig, SecondaryServiceConfig, SessionConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_user_agent_config(&config.user_agent)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_primary_config(&config.primary)?;
    validate_secondary_config(&config.secondary)?;
    validate_session_config(&config.session)?;
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    // Contact details are optional, but must be well-formed when present
    if !config.contact_url.is_empty() {
        Url::parse(&config.contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    if !config.contact_email.is_empty() {
        validate_email(&config.contact_email)?;
    }

    Ok(())
}

/// Validates request and backoff settings
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.initial_backoff_ms < 1 {
        return Err(ConfigError::Validation(format!(
            "initial_backoff_ms must be >= 1, got {}",
            config.initial_backoff_ms
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates the HTML search service settings
fn validate_primary_config(config: &PrimaryServiceConfig) -> Result<(), ConfigError> {
    validate_base_url("primary", &config.base_url)?;
    validate_search_path("primary", &config.search_path)?;

    if config.repo_label.is_empty() || config.repo_label.contains(':') {
        return Err(ConfigError::Validation(format!(
            "primary repo_label must be non-empty and must not contain ':', got '{}'",
            config.repo_label
        )));
    }

    Ok(())
}

/// Validates the JSON search service settings
fn validate_secondary_config(config: &SecondaryServiceConfig) -> Result<(), ConfigError> {
    validate_base_url("secondary", &config.base_url)?;
    validate_search_path("secondary", &config.search_path)?;

    if config.per_page < 1 || config.per_page > 1000 {
        return Err(ConfigError::Validation(format!(
            "secondary per_page must be between 1 and 1000, got {}",
            config.per_page
        )));
    }

    Ok(())
}

/// Validates the session cookie
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if let Some(cookie) = &config.cookie {
        if cookie.trim().is_empty() {
            return Err(ConfigError::Validation(
                "session cookie cannot be blank".to_string(),
            ));
        }

        if cookie.contains(['\r', '\n']) {
            return Err(ConfigError::Validation(
                "session cookie cannot contain line breaks".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates a service origin: an absolute HTTP(S) URL without a trailing slash
fn validate_base_url(service: &str, base_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid {} base_url '{}': {}", service, base_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} base_url '{}' must use HTTP or HTTPS",
            service, base_url
        )));
    }

    if base_url.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "{} base_url '{}' must not end with '/'",
            service, base_url
        )));
    }

    Ok(())
}

fn validate_search_path(service: &str, path: &str) -> Result<(), ConfigError> {
    if !path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "{} search_path must start with '/', got '{}'",
            service, path
        )));
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    let (local, domain) = match parts.as_slice() {
        [local, domain] => (*local, *domain),
        _ => {
            return Err(ConfigError::Validation(format!(
                "Invalid email format: '{}'",
                email
            )))
        }
    };

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
