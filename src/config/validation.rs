use crate::config::types::{
    ClientConfig, Config, CrawlerConfig, DelayRange, OutputConfig, PacingConfig, SessionConfig,
    SourceConfig,
};
use crate::url::{ListingTemplate, ParentId};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_pacing_config(&config.pacing)?;
    validate_source_config(&config.source)?;
    validate_session_config(&config.session)?;
    validate_client_config(&config.client)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_consecutive_empty < 1 {
        return Err(ConfigError::Validation(format!(
            "max-consecutive-empty must be >= 1, got {}",
            config.max_consecutive_empty
        )));
    }

    if config.cooldown_every_n_parents < 1 {
        return Err(ConfigError::Validation(format!(
            "cooldown-every-n-parents must be >= 1, got {}",
            config.cooldown_every_n_parents
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1 when set".to_string(),
        ));
    }

    for parent in &config.parents {
        let id = ParentId::parse(parent)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid parent '{}': {}", parent, e)))?;

        if id.unit_key().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Parent '{}' has no path segment to address its listing",
                parent
            )));
        }
    }

    Ok(())
}

/// Validates pacing configuration
fn validate_pacing_config(config: &PacingConfig) -> Result<(), ConfigError> {
    validate_delay_range("page-delay-ms", &config.page_delay)?;
    validate_delay_range("pause-delay-ms", &config.pause_delay)?;
    validate_delay_range("cooldown-delay-ms", &config.cooldown_delay)?;

    if config.pause_every_n_discoveries < 1 {
        return Err(ConfigError::Validation(format!(
            "pause-every-n-discoveries must be >= 1, got {}",
            config.pause_every_n_discoveries
        )));
    }

    Ok(())
}

fn validate_delay_range(name: &str, range: &DelayRange) -> Result<(), ConfigError> {
    if range.min_ms > range.max_ms {
        return Err(ConfigError::Validation(format!(
            "{} lower bound {} exceeds upper bound {}",
            name, range.min_ms, range.max_ms
        )));
    }
    Ok(())
}

/// Validates source configuration
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    ListingTemplate::new(&config.listing_url)
        .validate(true)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid listing-url: {}", e)))?;

    if let Some(events_url) = &config.events_url {
        ListingTemplate::new(events_url)
            .validate(false)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid events-url: {}", e)))?;

        if config.event_href_contains.is_empty() {
            return Err(ConfigError::Validation(
                "event-href-contains cannot be empty".to_string(),
            ));
        }
    }

    if config.profile_href_contains.is_empty() {
        return Err(ConfigError::Validation(
            "profile-href-contains cannot be empty".to_string(),
        ));
    }

    validate_selector("profile-selector", &config.profile_selector)?;
    if let Some(selector) = &config.no_results_selector {
        validate_selector("no-results-selector", selector)?;
    }

    if config.discovery_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "discovery-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_selector(name: &str, selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", name, selector, e)))
}

/// Validates session configuration
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.check_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid check-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "check-url must use HTTP or HTTPS, got '{}'",
            url.scheme()
        )));
    }

    if config.auth_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "auth-retries must be >= 1, got {}",
            config.auth_retries
        )));
    }

    if matches!(&config.cookie_file, Some(path) if path.is_empty()) {
        return Err(ConfigError::Validation(
            "cookie-file cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates HTTP client configuration
fn validate_client_config(config: &ClientConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request and connect timeouts must be >= 1 second".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, path) in [
        ("history-path", &config.history_path),
        ("csv-path", &config.csv_path),
        ("log-path", &config.log_path),
    ] {
        if path.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.history_path == config.csv_path || config.history_path == config.log_path {
        return Err(ConfigError::Validation(
            "history-path must differ from csv-path and log-path".to_string(),
        ));
    }

    Ok(())
}
