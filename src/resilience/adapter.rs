//! Per-dependency failure policies built on a circuit breaker.
//!
//! # Profiles
//! - Critical (primary datastore): every failure reaches the caller
//! - Non-critical (cache store): failures degrade to a caller-supplied fallback
//!
//! Both profiles expose the same liveness probe so the health aggregator can
//! treat them uniformly.

use std::fmt::Display;
use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::health::probe::PingClient;
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::resilience::error::CircuitBreakerError;

/// Whether an outage makes the service unhealthy or merely degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    Critical,
    NonCritical,
}

/// Result of a liveness probe routed through an adapter's breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterHealth {
    pub healthy: bool,
    pub state: CircuitState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A dependency guarded by its own circuit breaker.
#[async_trait]
pub trait DependencyAdapter: Send + Sync {
    fn criticality(&self) -> Criticality;

    fn breaker(&self) -> &CircuitBreaker;

    fn name(&self) -> &str {
        self.breaker().name()
    }

    /// Ping the dependency through the breaker.
    ///
    /// Never fails; an open circuit reports unhealthy without pinging.
    async fn health_check(&self, client: &dyn PingClient) -> AdapterHealth {
        let result = self.breaker().execute(|| client.ping()).await;
        let state = self.breaker().state();
        match result {
            Ok(()) => AdapterHealth {
                healthy: true,
                state,
                error: None,
            },
            Err(err) => AdapterHealth {
                healthy: false,
                state,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Adapter for a dependency the service cannot run without.
#[derive(Debug)]
pub struct CriticalDependency {
    breaker: CircuitBreaker,
}

impl CriticalDependency {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            breaker: CircuitBreaker::new(name, config),
        }
    }

    /// Run `operation` through the breaker, surfacing every failure.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.breaker.execute(operation).await.inspect_err(|err| {
            tracing::error!(
                dependency = %self.breaker.name(),
                kind = err.kind(),
                error = %err,
                "Critical dependency call failed"
            );
        })
    }
}

impl DependencyAdapter for CriticalDependency {
    fn criticality(&self) -> Criticality {
        Criticality::Critical
    }

    fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

/// Adapter for a dependency that only gates optional functionality.
#[derive(Debug)]
pub struct OptionalDependency {
    breaker: CircuitBreaker,
}

impl OptionalDependency {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            breaker: CircuitBreaker::new(name, config),
        }
    }

    /// Run `operation` through the breaker; any failure yields `fallback`.
    pub async fn execute<F, Fut, T, E>(&self, operation: F, fallback: T) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        match self.breaker.execute(operation).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(
                    dependency = %self.breaker.name(),
                    kind = err.kind(),
                    error = %err,
                    "Optional dependency unavailable, using fallback"
                );
                fallback
            }
        }
    }
}

impl DependencyAdapter for OptionalDependency {
    fn criticality(&self) -> Criticality {
        Criticality::NonCritical
    }

    fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}
