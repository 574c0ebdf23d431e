//! Configuration validation
//!
//! Validates AirScope configuration for correctness:
//! - Upstream URLs are http(s)
//! - Timeouts and cache TTL are non-zero
//! - Interpolation and search bounds are sane
//! - The bind address parses

use super::airscope_config::AirScopeConfig;
use crate::AirScopeError;
use std::net::SocketAddr;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Upper bound on expansion steps; each step doubles the padding.
pub const MAX_EXPANSIONS: u32 = 3;

/// Validate an AirScope configuration
pub fn validate_config(config: &AirScopeConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if config.server.bind.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind",
            format!("Invalid socket address: {}", config.server.bind),
        ));
    }

    for (field, url) in [
        ("geocoder.base_url", &config.geocoder.base_url),
        ("sensors.base_url", &config.sensors.base_url),
    ] {
        if !is_http_url(url) {
            errors.push(ValidationError::new(field, format!("Invalid URL: {}", url)));
        }
    }

    for (field, secs) in [
        ("geocoder.timeout_secs", config.geocoder.timeout_secs),
        ("sensors.timeout_secs", config.sensors.timeout_secs),
        ("cache.ttl_secs", config.cache.ttl_secs),
        ("cache.max_entries", config.cache.max_entries),
    ] {
        if secs == 0 {
            errors.push(ValidationError::new(field, "Must be greater than 0"));
        }
    }

    for (field, name) in [
        ("geocoder.api_key_env", &config.geocoder.api_key_env),
        ("sensors.api_key_env", &config.sensors.api_key_env),
    ] {
        if name.trim().is_empty() {
            errors.push(ValidationError::new(
                field,
                "Environment variable name cannot be empty",
            ));
        }
    }

    if config.interpolation.k_max == 0 {
        errors.push(ValidationError::new(
            "interpolation.k_max",
            "Must be at least 1",
        ));
    }

    if config.search.max_expansions > MAX_EXPANSIONS {
        errors.push(ValidationError::new(
            "search.max_expansions",
            format!(
                "At most {} expansions are allowed, got {}",
                MAX_EXPANSIONS, config.search.max_expansions
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// Validate configuration and return a Result
pub fn validate_config_result(config: &AirScopeConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        AirScopeError::Config(format!(
            "Configuration validation failed:\n  - {}",
            messages.join("\n  - ")
        ))
    })
}
