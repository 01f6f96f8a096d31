//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Breakers, adapters, cache, health aggregator produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout log aggregation
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Structured fields (`breaker`, `dependency`, `key`) on every event
//! - Metrics are fire-and-forget; no recorder means no cost beyond a lookup

pub mod logging;
pub mod metrics;
