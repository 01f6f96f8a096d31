//! Error taxonomy for protected calls.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors returned by a call routed through a circuit breaker.
///
/// `E` is the dependency's own error type, carried unchanged in `Upstream`.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// Call rejected without invoking the wrapped operation.
    #[error("circuit breaker '{name}' is open")]
    CircuitOpen {
        name: String,
        /// When the breaker will admit its next probe, if known.
        next_attempt: Option<DateTime<Utc>>,
    },

    /// The wrapped operation did not settle within its deadline.
    #[error("call through '{name}' timed out after {timeout_ms}ms")]
    Timeout { name: String, timeout_ms: u64 },

    /// The wrapped operation failed.
    #[error("upstream error: {0}")]
    Upstream(E),
}

impl<E> CircuitBreakerError<E> {
    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CircuitBreakerError::CircuitOpen { .. } => "circuit_open",
            CircuitBreakerError::Timeout { .. } => "timeout",
            CircuitBreakerError::Upstream(_) => "upstream",
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::CircuitOpen { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CircuitBreakerError::Timeout { .. })
    }

    /// Returns the dependency error, if this is an upstream failure.
    pub fn into_upstream(self) -> Option<E> {
        match self {
            CircuitBreakerError::Upstream(e) => Some(e),
            _ => None,
        }
    }
}
