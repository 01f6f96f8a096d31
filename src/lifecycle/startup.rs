//! Startup orchestration.
//!
//! # Responsibilities
//! - Build one circuit breaker per dependency from validated config
//! - Wrap the primary store as critical and the cache store as optional
//! - Wire the cache service and health aggregator to those adapters
//!
//! # Design Decisions
//! - Fail fast: config is validated before this runs
//! - Subsystems initialize in order, not concurrently
//! - Background loops are spawned by the caller, not here

use std::sync::Arc;

use crate::cache::{CacheBackend, CacheService, InMemoryCacheBackend};
use crate::config::schema::AppConfig;
use crate::health::{
    CacheBackendProbe, DuplicateDependency, HealthCheckAggregator, PingClient, TcpProbe,
};
use crate::resilience::adapter::{CriticalDependency, OptionalDependency};

/// Everything the service shares across handlers and background tasks.
pub struct AppContext {
    pub config: AppConfig,
    pub database: Arc<CriticalDependency>,
    pub cache_dependency: Arc<OptionalDependency>,
    pub cache_backend: InMemoryCacheBackend,
    pub cache: Arc<CacheService>,
    pub health: Arc<HealthCheckAggregator>,
}

/// Build the context around the in-process cache store and a TCP probe of the primary store.
pub fn build_context(config: AppConfig) -> Result<AppContext, DuplicateDependency> {
    let backend = InMemoryCacheBackend::new();
    let database_probe: Arc<dyn PingClient> = Arc::new(TcpProbe::new(config.dependencies.primary.address.clone()));
    build_context_with(config, backend, database_probe)
}

/// Build the context with an explicit primary-store probe.
pub fn build_context_with(
    config: AppConfig,
    cache_backend: InMemoryCacheBackend,
    database_probe: Arc<dyn PingClient>,
) -> Result<AppContext, DuplicateDependency> {
    let primary = &config.dependencies.primary;
    let database = Arc::new(CriticalDependency::new(primary.name.clone(), primary.breaker_config()));

    let secondary = &config.dependencies.cache;
    let cache_dependency = Arc::new(OptionalDependency::new(secondary.name.clone(), secondary.breaker_config()));

    let shared_backend: Arc<dyn CacheBackend> = Arc::new(cache_backend.clone());
    let cache = Arc::new(CacheService::new(
        shared_backend.clone(),
        cache_dependency.clone(),
        config.cache.ttl,
    ));

    let health = Arc::new(
        HealthCheckAggregator::new()
            .with_dependency(database.clone(), database_probe)?
            .with_dependency(cache_dependency.clone(), Arc::new(CacheBackendProbe::new(shared_backend)))?,
    );

    tracing::info!(
        primary = %primary.name,
        primary_address = %primary.address,
        cache = %secondary.name,
        "Dependencies initialized"
    );

    Ok(AppContext {
        config,
        database,
        cache_dependency,
        cache_backend,
        cache,
        health,
    })
}
