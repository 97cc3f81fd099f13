use crate::config::types::{ApiConfig, Config, CrawlConfig, TransformConfig};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_crawl_config(&config.crawl)?;
    validate_transform_config(&config.transform)?;
    Ok(())
}

/// Validates API connection settings
pub fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let base_url = config
        .base_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .ok_or(ConfigError::MissingBaseUrl)?;
    validate_base_url(base_url)?;

    if config.max_concurrent < 1 || config.max_concurrent > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent must be between 1 and 100, got {}",
            config.max_concurrent
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be at least 1".to_string(),
        ));
    }

    if config.page_entity.is_empty() {
        return Err(ConfigError::Validation(
            "page-entity cannot be empty".to_string(),
        ));
    }

    validate_patterns("relationships", &config.relationships)?;
    Ok(())
}

/// Validates the base URL: absolute, http(s), with a host
fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", base_url, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' has no host",
            base_url
        )));
    }

    Ok(())
}

/// Validates crawl roots and kinds
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.roots.is_empty() && config.kinds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one crawl root or kind is required".to_string(),
        ));
    }

    for root in &config.roots {
        if !root.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "crawl root '{}' must be an API-relative path starting with '/'",
                root
            )));
        }
    }

    for kind in &config.kinds {
        if kind.is_empty() || kind.contains('/') {
            return Err(ConfigError::Validation(format!(
                "crawl kind '{}' must be a bare entity type name",
                kind
            )));
        }
    }

    Ok(())
}

fn validate_transform_config(config: &TransformConfig) -> Result<(), ConfigError> {
    validate_patterns("attribute-filters", &config.attribute_filters)?;
    validate_patterns("relationship-filters", &config.relationship_filters)?;
    validate_patterns("field-property-filters", &config.field_property_filters)?;
    Ok(())
}

/// Checks that every pattern in a list compiles
fn validate_patterns(field: &str, patterns: &[String]) -> Result<(), ConfigError> {
    for pattern in patterns {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("{} entry '{}': {}", field, pattern, e))
        })?;
    }
    Ok(())
}
