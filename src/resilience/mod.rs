//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a dependency:
//!     → adapter.rs (critical: propagate / optional: fallback)
//!     → circuit_breaker.rs (admit or reject, race call against timeout,
//!       account outcome, transition state)
//!     → error.rs (CircuitOpen | Timeout | Upstream)
//! ```
//!
//! # Design Decisions
//! - One breaker per dependency, built once by the composition root
//! - Timeouts are non-negotiable; every protected call has a deadline
//! - Breaker state is process-local; replicas keep independent circuits

pub mod adapter;
pub mod circuit_breaker;
pub mod error;

pub use adapter::{AdapterHealth, Criticality, CriticalDependency, DependencyAdapter, OptionalDependency};
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, CircuitBreakerStats, CircuitState,
};
pub use error::CircuitBreakerError;
