use axum::{extract::State, Json};
use serde::Serialize;

use crate::cache::{CacheStats, TtlPolicy};
use crate::health::OverallStatus;
use crate::http::server::AppState;
use crate::resilience::CircuitBreakerSnapshot;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: &'static str,
    /// Status from the last completed health check, if any ran yet.
    pub last_health_status: Option<OverallStatus>,
    pub dependencies: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub reset: bool,
    pub circuit_breakers: Vec<CircuitBreakerSnapshot>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheOverview {
    pub entries: usize,
    pub stats: CacheStats,
    pub ttl: TtlPolicy,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let health = &state.context.health;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        last_health_status: health.latest_report().map(|report| report.status),
        dependencies: health.dependency_names().into_iter().map(String::from).collect(),
    })
}

pub async fn get_circuit_breakers(State(state): State<AppState>) -> Json<Vec<CircuitBreakerSnapshot>> {
    Json(state.context.health.circuit_breaker_stats())
}

pub async fn reset_circuit_breakers(State(state): State<AppState>) -> Json<ResetResponse> {
    Json(ResetResponse {
        reset: true,
        circuit_breakers: state.context.health.reset_circuit_breakers(),
    })
}

pub async fn get_cache(State(state): State<AppState>) -> Json<CacheOverview> {
    let cache = &state.context.cache;
    Json(CacheOverview {
        entries: state.context.cache_backend.len(),
        stats: cache.stats(),
        ttl: cache.policy(),
    })
}
