use crate::config::types::{
    AdmissionConfig, Config, DefaultProxyConfig, ExtractionConfig, MetricsConfig,
};
use crate::extraction::{Field, SelectorRule};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_admission_config(&config.admission)?;
    validate_default_proxy(&config.default_proxy)?;
    validate_extraction_config(&config.extraction)?;
    validate_metrics_config(&config.metrics)?;
    Ok(())
}

/// Validates admission configuration
fn validate_admission_config(config: &AdmissionConfig) -> Result<(), ConfigError> {
    if config.burst < 1 {
        return Err(ConfigError::Validation(format!(
            "burst must be >= 1, got {}",
            config.burst
        )));
    }

    if config.refill_per_minute < 1 {
        return Err(ConfigError::Validation(format!(
            "refill_per_minute must be >= 1, got {}",
            config.refill_per_minute
        )));
    }

    if config.sweep_interval_secs < 1 {
        return Err(ConfigError::Validation(
            "sweep_interval_secs must be >= 1".to_string(),
        ));
    }

    if config.idle_ttl_secs < 1 {
        return Err(ConfigError::Validation(
            "idle_ttl_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the default proxy section
fn validate_default_proxy(config: &DefaultProxyConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "default proxy name cannot be empty".to_string(),
        ));
    }

    if !config.host.is_empty() {
        if config.port == 0 {
            return Err(ConfigError::Validation(
                "default proxy port cannot be 0 when a host is set".to_string(),
            ));
        }

        if config.host.contains("://") || config.host.contains('/') {
            return Err(ConfigError::Validation(format!(
                "default proxy host must be a bare host name, got '{}'",
                config.host
            )));
        }
    }

    Ok(())
}

/// Validates extraction configuration
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            config.base_url
        )));
    }

    if config.timeout_secs < 1 || config.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be between 1 and 300, got {}",
            config.timeout_secs
        )));
    }

    if config.max_bulk_urls < 1 || config.max_bulk_urls > 50 {
        return Err(ConfigError::Validation(format!(
            "max_bulk_urls must be between 1 and 50, got {}",
            config.max_bulk_urls
        )));
    }

    if config.default_currency.len() != 3
        || !config
            .default_currency
            .chars()
            .all(|c| c.is_ascii_alphabetic())
    {
        return Err(ConfigError::Validation(format!(
            "default_currency must be a three-letter code, got '{}'",
            config.default_currency
        )));
    }

    if config.request_deadline_secs == Some(0) {
        return Err(ConfigError::Validation(
            "request_deadline_secs must be >= 1 when set".to_string(),
        ));
    }

    validate_rule_overrides(config)
}

/// Validates per-field selector overrides
fn validate_rule_overrides(config: &ExtractionConfig) -> Result<(), ConfigError> {
    for (name, selectors) in &config.rules {
        if Field::from_name(name).is_none() {
            return Err(ConfigError::Validation(format!(
                "Unknown extraction field '{}'",
                name
            )));
        }

        if selectors.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Extraction field '{}' needs at least one selector",
                name
            )));
        }

        for selector in selectors {
            SelectorRule::parse(selector).map_err(|e| {
                ConfigError::Validation(format!("Field '{}': {}", name, e))
            })?;
        }
    }

    Ok(())
}

/// Validates metrics configuration
fn validate_metrics_config(config: &MetricsConfig) -> Result<(), ConfigError> {
    if config.recent_ids < 1 {
        return Err(ConfigError::Validation(
            "recent_ids must be >= 1".to_string(),
        ));
    }
    Ok(())
}
