//! Administrative API.
//!
//! Breaker inspection and reset, cache statistics. Every route sits behind
//! bearer-token authentication.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/circuit-breakers", get(get_circuit_breakers))
        .route("/admin/circuit-breakers/reset", post(reset_circuit_breakers))
        .route("/admin/cache", get(get_cache))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
