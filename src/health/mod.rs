//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer or GET /health:
//!     → aggregator.rs check()
//!     → each DependencyAdapter health_check (concurrently)
//!     → probe.rs ping through the adapter's breaker
//!     → overall status: critical down ⇒ unhealthy,
//!                       optional down ⇒ degraded,
//!                       otherwise healthy
//!
//! GET /health/ready:
//!     → aggregator.rs readiness() (critical dependencies only)
//! ```
//!
//! # Design Decisions
//! - Probes go through the breakers, so an open circuit reports down without
//!   touching the dependency
//! - The latest report is retained for diagnostics only
//! - Breaker reset is operator tooling, not part of request flow

pub mod aggregator;
pub mod probe;

pub use aggregator::{
    derive_status, DependencyReport, DependencyStatus, DuplicateDependency, HealthCheckAggregator,
    HealthReport, OverallStatus, ReadinessReport,
};
pub use probe::{CacheBackendProbe, PingClient, ProbeError, TcpProbe};
