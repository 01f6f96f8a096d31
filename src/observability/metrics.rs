//! Metrics collection and exposition.
//!
//! # Metrics
//! - `circuit_breaker_state` (gauge): 0=closed, 1=half-open, 2=open, per breaker
//! - `circuit_breaker_calls_total` (counter): by breaker and outcome
//! - `cache_lookups_total` (counter): by result (hit, miss)
//! - `cache_writes_total` (counter): by result (stored, skipped, failed)
//! - `cache_invalidated_keys_total` (counter)
//! - `cache_entries` (gauge): entries held by the in-process backend
//! - `dependency_up` (gauge): 1=up, 0=down, per dependency
//! - `dependency_probe_duration_seconds` (histogram)
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_breaker_state(breaker: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    gauge!("circuit_breaker_state", "breaker" => breaker.to_string()).set(value);
}

pub fn record_breaker_call(breaker: &str, outcome: &'static str) {
    counter!(
        "circuit_breaker_calls_total",
        "breaker" => breaker.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_write(result: &'static str) {
    counter!("cache_writes_total", "result" => result).increment(1);
}

pub fn record_cache_invalidation(keys: usize) {
    counter!("cache_invalidated_keys_total").increment(keys as u64);
}

pub fn record_cache_size(entries: usize) {
    gauge!("cache_entries").set(entries as f64);
}

pub fn record_dependency_health(dependency: &str, up: bool, elapsed: Duration) {
    gauge!("dependency_up", "dependency" => dependency.to_string()).set(if up { 1.0 } else { 0.0 });
    histogram!("dependency_probe_duration_seconds", "dependency" => dependency.to_string())
        .record(elapsed.as_secs_f64());
}
