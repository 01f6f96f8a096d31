//! Resilience and caching core.
//!
//! Circuit breakers per dependency, critical and optional dependency
//! adapters, a TTL cache over a pluggable store, and health aggregation.

pub mod admin;
pub mod cache;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use cache::CacheService;
pub use config::AppConfig;
pub use health::HealthCheckAggregator;
pub use http::HttpServer;
pub use lifecycle::{AppContext, Shutdown};
pub use resilience::{CircuitBreaker, CircuitBreakerError, CriticalDependency, OptionalDependency};
