//! Health endpoints.
//!
//! Degraded still answers 200 so load balancers keep routing; only a critical
//! dependency outage turns `/health` into 503.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;

use crate::health::{HealthReport, ReadinessReport};
use crate::http::server::AppState;

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.context.health.check().await;
    let code = if report.status.is_serving() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}

pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadinessReport>) {
    let report = state.context.health.readiness().await;
    let code = if report.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}

/// Process liveness. Never touches dependencies.
pub async fn live() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "timestamp": Utc::now(),
    }))
}
