use std::collections::HashSet;

use crate::config::types::{Config, HttpConfig, RegistryConfig, ScraperConfig, SourceEntry};
use crate::model::SourceId;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_registry_config(&config.registry)?;
    validate_scraper_config(&config.scraper)?;
    validate_http_config(&config.http)?;
    validate_sources(&config.sources)?;
    Ok(())
}

/// Validates registry connection settings
fn validate_registry_config(config: &RegistryConfig) -> Result<(), ConfigError> {
    validate_http_url(&config.url, "registry url")?;

    if config.token.trim().is_empty() {
        return Err(ConfigError::Validation(
            "registry token cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "registry timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.write_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "write-retries must be at most 10, got {}",
            config.write_retries
        )));
    }

    Ok(())
}

/// Concurrency above this is allowed but hard on the bank websites
const POLITE_BATCH_SIZE: usize = 50;

/// Validates scraper tuning
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 {
        return Err(ConfigError::Validation(
            "batch-size must be >= 1".to_string(),
        ));
    }
    if config.batch_size > POLITE_BATCH_SIZE {
        tracing::warn!(
            "batch-size {} sends more than {} concurrent detail requests to one site",
            config.batch_size,
            POLITE_BATCH_SIZE
        );
    }

    if config.page_delay_ms < 500 {
        return Err(ConfigError::Validation(format!(
            "page-delay-ms must be >= 500ms, got {}ms",
            config.page_delay_ms
        )));
    }

    if config.listing_timeout_secs < 1 || config.detail_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeouts must be >= 1s, got listing={}s detail={}s",
            config.listing_timeout_secs, config.detail_timeout_secs
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1".to_string(),
        ));
    }

    if config.max_consecutive_page_errors < 1 {
        return Err(ConfigError::Validation(
            "max-consecutive-page-errors must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates outgoing request identity
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    for name in config.headers.keys() {
        if reqwest::header::HeaderName::from_bytes(name.as_bytes()).is_err() {
            return Err(ConfigError::Validation(format!(
                "invalid header name '{}'",
                name
            )));
        }
    }

    Ok(())
}

/// Validates `[[source]]` entries
fn validate_sources(sources: &[SourceEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in sources {
        if SourceId::from_tag(&entry.id).is_none() {
            return Err(ConfigError::UnknownSource(entry.id.clone()));
        }

        if !seen.insert(entry.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "source '{}' is configured more than once",
                entry.id
            )));
        }

        if let Some(base_url) = &entry.base_url {
            validate_http_url(base_url, &format!("base-url of source '{}'", entry.id))?;
        }
    }

    Ok(())
}

/// Checks that `value` parses as an absolute http(s) URL
fn validate_http_url(value: &str, what: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            what, value
        )));
    }

    Ok(())
}
