//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before a config is accepted, at startup and on reload

use std::net::SocketAddr;

use thiserror::Error;

use crate::cache::ttl::MAX_TTL_SECS;
use crate::config::schema::AppConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: String },

    #[error("{field} must not exceed {max}")]
    TooLarge { field: String, max: u64 },

    #[error("{field} is not a valid socket address: '{value}'")]
    InvalidAddress { field: String, value: String },

    #[error("{field} must not be empty")]
    Empty { field: String },

    #[error("admin.api_key must be changed when the admin API is enabled")]
    PlaceholderApiKey,

    #[error("dependency names must be unique, '{0}' is used twice")]
    DuplicateDependency(String),
}

/// Check semantic constraints serde cannot express.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "server.bind_address", &config.server.bind_address);
    check_positive(&mut errors, "server.request_timeout_secs", config.server.request_timeout_secs);

    if config.admin.enabled {
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::Empty { field: "admin.api_key".into() });
        } else if config.admin.api_key == "CHANGE_ME_IN_PRODUCTION" {
            errors.push(ValidationError::PlaceholderApiKey);
        }
    }

    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    if config.health.enabled {
        check_positive(&mut errors, "health.interval_secs", config.health.interval_secs);
    }

    let primary = &config.dependencies.primary;
    check_name(&mut errors, "dependencies.primary.name", &primary.name);
    if primary.address.is_empty() {
        errors.push(ValidationError::Empty { field: "dependencies.primary.address".into() });
    }
    for (field, value) in [
        ("dependencies.primary.failure_threshold", primary.failure_threshold as u64),
        ("dependencies.primary.success_threshold", primary.success_threshold as u64),
        ("dependencies.primary.timeout_ms", primary.timeout_ms),
        ("dependencies.primary.recovery_timeout_ms", primary.recovery_timeout_ms),
    ] {
        check_positive(&mut errors, field, value);
    }

    let cache = &config.dependencies.cache;
    check_name(&mut errors, "dependencies.cache.name", &cache.name);
    for (field, value) in [
        ("dependencies.cache.failure_threshold", cache.failure_threshold as u64),
        ("dependencies.cache.success_threshold", cache.success_threshold as u64),
        ("dependencies.cache.timeout_ms", cache.timeout_ms),
        ("dependencies.cache.recovery_timeout_ms", cache.recovery_timeout_ms),
    ] {
        check_positive(&mut errors, field, value);
    }

    if !primary.name.is_empty() && primary.name == cache.name {
        errors.push(ValidationError::DuplicateDependency(primary.name.clone()));
    }

    check_positive(&mut errors, "cache.sweep_interval_secs", config.cache.sweep_interval_secs);
    for field in config.cache.ttl.zero_entries() {
        errors.push(ValidationError::Zero { field: format!("cache.ttl.{field}") });
    }
    for field in config.cache.ttl.oversized_entries() {
        errors.push(ValidationError::TooLarge {
            field: format!("cache.ttl.{field}"),
            max: MAX_TTL_SECS,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_positive(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::Zero { field: field.to_string() });
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

fn check_name(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::Empty { field: field.to_string() });
    }
}
