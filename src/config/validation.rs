use crate::config::types::{Config, CrawlerConfig, ExtractorConfig, RequestConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_request_config(&config.request)?;
    validate_extractor_config(&config.extractor)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_connections < 1 || config.max_connections > 10_000 {
        return Err(ConfigError::Validation(format!(
            "max_connections must be between 1 and 10000, got {}",
            config.max_connections
        )));
    }

    if config.retry_workers < 1 {
        return Err(ConfigError::Validation(format!(
            "retry_workers must be >= 1, got {}",
            config.retry_workers
        )));
    }

    if config.drain_polls < 1 {
        return Err(ConfigError::Validation(format!(
            "drain_polls must be >= 1, got {}",
            config.drain_polls
        )));
    }

    if config.request_timeout == 0 || config.connect_timeout == 0 {
        return Err(ConfigError::Validation(
            "request_timeout and connect_timeout must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates outgoing request configuration
fn validate_request_config(config: &RequestConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if base.scheme() != "https" && base.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.default_handle.is_empty() || config.default_handle.contains('/') {
        return Err(ConfigError::Validation(format!(
            "default_handle must be a non-empty path segment, got '{}'",
            config.default_handle
        )));
    }

    if let Some(proxy) = &config.proxy {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    Ok(())
}

/// Validates extractor configuration
fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    Selector::parse(&config.selector).map_err(|e| {
        ConfigError::Validation(format!("Invalid selector '{}': {:?}", config.selector, e))
    })?;
    Ok(())
}
