//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::ttl::TtlPolicy;
use crate::resilience::circuit_breaker::CircuitBreakerConfig;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener for health and admin endpoints.
    pub server: ServerConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Periodic health check settings.
    pub health: HealthConfig,

    /// Protected dependencies.
    pub dependencies: DependenciesConfig,

    /// Cache settings.
    pub cache: CacheConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Periodic health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HealthConfig {
    /// Run checks in the background.
    pub enabled: bool,

    /// Interval between checks in seconds.
    pub interval_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
        }
    }
}

/// Protected dependencies.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct DependenciesConfig {
    /// Primary datastore (critical).
    pub primary: PrimaryStoreConfig,

    /// Secondary cache store (non-critical).
    pub cache: CacheStoreConfig,
}

/// Primary datastore breaker and probe settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PrimaryStoreConfig {
    /// Breaker and dependency name.
    pub name: String,
    /// host:port probed by the TCP liveness check.
    pub address: String,
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub timeout_ms: u64,
    pub recovery_timeout_ms: u64,
}

impl Default for PrimaryStoreConfig {
    fn default() -> Self {
        let profile = CircuitBreakerConfig::critical();
        Self {
            name: "database".to_string(),
            address: "127.0.0.1:5432".to_string(),
            failure_threshold: profile.failure_threshold,
            success_threshold: profile.success_threshold,
            timeout_ms: profile.timeout.as_millis() as u64,
            recovery_timeout_ms: profile.recovery_timeout.as_millis() as u64,
        }
    }
}

impl PrimaryStoreConfig {
    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            timeout: Duration::from_millis(self.timeout_ms),
            recovery_timeout: Duration::from_millis(self.recovery_timeout_ms),
        }
    }
}

/// Cache store breaker settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheStoreConfig {
    /// Breaker and dependency name.
    pub name: String,
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub timeout_ms: u64,
    pub recovery_timeout_ms: u64,
}

impl Default for CacheStoreConfig {
    fn default() -> Self {
        let profile = CircuitBreakerConfig::non_critical();
        Self {
            name: "cache".to_string(),
            failure_threshold: profile.failure_threshold,
            success_threshold: profile.success_threshold,
            timeout_ms: profile.timeout.as_millis() as u64,
            recovery_timeout_ms: profile.recovery_timeout.as_millis() as u64,
        }
    }
}

impl CacheStoreConfig {
    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            timeout: Duration::from_millis(self.timeout_ms),
            recovery_timeout: Duration::from_millis(self.recovery_timeout_ms),
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Interval between expired-entry sweeps in seconds.
    pub sweep_interval_secs: u64,

    /// TTL per data category.
    pub ttl: TtlPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
            ttl: TtlPolicy::default(),
        }
    }
}
