//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: probing whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold
//! Open → Half-Open: first call after next_attempt_at
//! Half-Open → Closed: success_count >= success_threshold
//! Half-Open → Open: any probe failure (next_attempt_at recomputed)
//! ```
//!
//! # Design Decisions
//! - Every call races a timer; the first settlement wins and the losing
//!   future is dropped, so a slow success cannot mask a timeout
//! - State lives behind a single mutex that is never held across `.await`
//! - Single probe in Half-Open: concurrent callers are rejected while a probe
//!   is in flight
//! - Each transition bumps a generation; outcomes of calls admitted under an
//!   older generation update stats only

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::observability::metrics;
use crate::resilience::error::CircuitBreakerError;

/// Operational mode of a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds and timings for one breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures (while closed) that open the circuit.
    pub failure_threshold: u32,
    /// Consecutive half-open successes that close the circuit.
    pub success_threshold: u32,
    /// Deadline for a single protected call.
    pub timeout: Duration,
    /// How long the circuit stays open before admitting a probe.
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_millis(10_000),
            recovery_timeout: Duration::from_millis(60_000),
        }
    }
}

impl CircuitBreakerConfig {
    /// Profile for dependencies whose outage makes the service unusable.
    pub fn critical() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_millis(5_000),
            recovery_timeout: Duration::from_millis(30_000),
        }
    }

    /// Profile for dependencies that gate optional functionality.
    pub fn non_critical() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 2,
            timeout: Duration::from_millis(2_000),
            recovery_timeout: Duration::from_millis(15_000),
        }
    }
}

/// Cumulative call accounting. Never reset, not even by [`CircuitBreaker::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerStats {
    /// Every `execute` invocation, including rejected ones.
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub rejected_calls: u64,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
}

/// Read-only view of a breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failures: u32,
    pub successes: u32,
    /// Only set while the circuit is open.
    pub next_attempt: Option<DateTime<Utc>>,
    pub stats: CircuitBreakerStats,
}

#[derive(Debug)]
struct BreakerCore {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    next_attempt_at: Option<Instant>,
    next_attempt_wall: Option<DateTime<Utc>>,
    probe_in_flight: bool,
    generation: u64,
    stats: CircuitBreakerStats,
}

impl BreakerCore {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            next_attempt_at: None,
            next_attempt_wall: None,
            probe_in_flight: false,
            generation: 0,
            stats: CircuitBreakerStats::default(),
        }
    }
}

/// A generic circuit breaker guarding one dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    core: Mutex<BreakerCore>,
}

/// Ticket for an admitted call. Releases the half-open probe slot if the
/// call is dropped before it settles.
struct Admission<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    probe: bool,
    settled: bool,
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if self.probe && !self.settled {
            let mut core = self.breaker.lock();
            if core.generation == self.generation {
                core.probe_in_flight = false;
            }
        }
    }
}

enum Outcome {
    Success,
    Failure,
    Timeout,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        tracing::info!(
            breaker = %name,
            failure_threshold = config.failure_threshold,
            success_threshold = config.success_threshold,
            timeout_ms = config.timeout.as_millis() as u64,
            recovery_timeout_ms = config.recovery_timeout.as_millis() as u64,
            "Circuit breaker initialized"
        );
        metrics::record_breaker_state(&name, CircuitState::Closed);

        Self {
            name,
            config,
            core: Mutex::new(BreakerCore::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state, without side effects.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Run `operation` under breaker protection.
    ///
    /// Rejected calls never invoke `operation`. A timeout counts as a failure
    /// and drops the in-flight future.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut admission = self.admit()?;

        let result = tokio::time::timeout(self.config.timeout, operation()).await;
        admission.settled = true;

        match result {
            Ok(Ok(value)) => {
                self.settle(&admission, Outcome::Success);
                Ok(value)
            }
            Ok(Err(err)) => {
                self.settle(&admission, Outcome::Failure);
                Err(CircuitBreakerError::Upstream(err))
            }
            Err(_) => {
                self.settle(&admission, Outcome::Timeout);
                Err(CircuitBreakerError::Timeout {
                    name: self.name.clone(),
                    timeout_ms: self.config.timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Force the circuit closed and zero its counters.
    ///
    /// Administrative escape hatch; bypasses normal failure accounting.
    pub fn reset(&self) {
        let mut core = self.lock();
        let previous = core.state;
        core.state = CircuitState::Closed;
        core.failure_count = 0;
        core.success_count = 0;
        core.next_attempt_at = None;
        core.next_attempt_wall = None;
        core.probe_in_flight = false;
        core.generation += 1;
        drop(core);

        metrics::record_breaker_state(&self.name, CircuitState::Closed);
        tracing::warn!(breaker = %self.name, previous = %previous, "Circuit breaker reset");
    }

    /// Copy of the current state and statistics.
    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let core = self.lock();
        CircuitBreakerSnapshot {
            name: self.name.clone(),
            state: core.state,
            failures: core.failure_count,
            successes: core.success_count,
            next_attempt: if core.state == CircuitState::Open {
                core.next_attempt_wall
            } else {
                None
            },
            stats: core.stats.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit<E>(&self) -> Result<Admission<'_>, CircuitBreakerError<E>> {
        let mut core = self.lock();
        core.stats.total_calls += 1;

        let probe = match core.state {
            CircuitState::Closed => false,
            CircuitState::Open => {
                let ready = core
                    .next_attempt_at
                    .map_or(true, |at| Instant::now() >= at);
                if !ready {
                    return Err(self.reject(&mut core));
                }
                self.to_half_open(&mut core);
                core.probe_in_flight = true;
                true
            }
            CircuitState::HalfOpen => {
                if core.probe_in_flight {
                    return Err(self.reject(&mut core));
                }
                core.probe_in_flight = true;
                true
            }
        };

        Ok(Admission {
            breaker: self,
            generation: core.generation,
            probe,
            settled: false,
        })
    }

    fn reject<E>(&self, core: &mut BreakerCore) -> CircuitBreakerError<E> {
        core.stats.rejected_calls += 1;
        metrics::record_breaker_call(&self.name, "rejected");
        tracing::debug!(breaker = %self.name, state = %core.state, "Call rejected");
        CircuitBreakerError::CircuitOpen {
            name: self.name.clone(),
            next_attempt: core.next_attempt_wall,
        }
    }

    fn settle(&self, admission: &Admission<'_>, outcome: Outcome) {
        let mut core = self.lock();
        let current = admission.generation == core.generation;
        if admission.probe && current {
            core.probe_in_flight = false;
        }

        match outcome {
            Outcome::Success => {
                core.stats.successful_calls += 1;
                core.stats.last_success = Some(Utc::now());
                metrics::record_breaker_call(&self.name, "success");
            }
            Outcome::Failure | Outcome::Timeout => {
                core.stats.failed_calls += 1;
                core.stats.last_failure = Some(Utc::now());
                metrics::record_breaker_call(
                    &self.name,
                    if matches!(outcome, Outcome::Timeout) { "timeout" } else { "failure" },
                );
            }
        }

        if !current {
            tracing::debug!(breaker = %self.name, "Ignoring outcome from a previous circuit generation");
            return;
        }

        match outcome {
            Outcome::Success => {
                core.failure_count = 0;
                if core.state == CircuitState::HalfOpen {
                    core.success_count += 1;
                    if core.success_count >= self.config.success_threshold {
                        self.to_closed(&mut core);
                    }
                }
            }
            Outcome::Failure | Outcome::Timeout => {
                core.success_count = 0;
                match core.state {
                    CircuitState::HalfOpen => self.to_open(&mut core),
                    CircuitState::Closed => {
                        core.failure_count += 1;
                        if core.failure_count >= self.config.failure_threshold {
                            self.to_open(&mut core);
                        }
                    }
                    CircuitState::Open => {}
                }
            }
        }
    }

    fn to_open(&self, core: &mut BreakerCore) {
        let recovery = self.config.recovery_timeout;
        core.state = CircuitState::Open;
        core.success_count = 0;
        core.probe_in_flight = false;
        core.next_attempt_at = Some(Instant::now() + recovery);
        core.next_attempt_wall = chrono::Duration::from_std(recovery)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d));
        core.generation += 1;

        metrics::record_breaker_state(&self.name, CircuitState::Open);
        tracing::error!(
            breaker = %self.name,
            failures = core.failure_count,
            failure_threshold = self.config.failure_threshold,
            recovery_timeout_ms = recovery.as_millis() as u64,
            "Circuit breaker opened"
        );
    }

    fn to_half_open(&self, core: &mut BreakerCore) {
        core.state = CircuitState::HalfOpen;
        core.success_count = 0;
        core.next_attempt_at = None;
        core.next_attempt_wall = None;
        core.generation += 1;

        metrics::record_breaker_state(&self.name, CircuitState::HalfOpen);
        tracing::info!(
            breaker = %self.name,
            success_threshold = self.config.success_threshold,
            "Circuit breaker half-open, probing"
        );
    }

    fn to_closed(&self, core: &mut BreakerCore) {
        core.state = CircuitState::Closed;
        core.failure_count = 0;
        core.success_count = 0;
        core.next_attempt_at = None;
        core.next_attempt_wall = None;
        core.generation += 1;

        metrics::record_breaker_state(&self.name, CircuitState::Closed);
        tracing::info!(breaker = %self.name, "Circuit breaker closed (recovered)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    fn config(failures: u32, successes: u32, timeout_ms: u64, recovery_ms: u64) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: failures,
            success_threshold: successes,
            timeout: Duration::from_millis(timeout_ms),
            recovery_timeout: Duration::from_millis(recovery_ms),
        }
    }

    async fn fail(breaker: &CircuitBreaker, calls: &AtomicU32) -> Result<(), CircuitBreakerError<&'static str>> {
        breaker
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("boom")
            })
            .await
    }

    async fn succeed(breaker: &CircuitBreaker, calls: &AtomicU32) -> Result<u32, CircuitBreakerError<&'static str>> {
        breaker
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &'static str>(7)
            })
            .await
    }

    #[tokio::test]
    async fn test_starts_closed_and_passes_calls() {
        let breaker = CircuitBreaker::new("test", CircuitBreakerConfig::default());
        let calls = AtomicU32::new(0);

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(succeed(&breaker, &calls).await.unwrap(), 7);

        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.stats.total_calls, 1);
        assert_eq!(snapshot.stats.successful_calls, 1);
        assert!(snapshot.stats.last_success.is_some());
        assert!(snapshot.next_attempt.is_none());
    }

    #[tokio::test]
    async fn test_opens_after_threshold_and_rejects_without_calling() {
        let breaker = CircuitBreaker::new("test", config(3, 2, 100, 60_000));
        let calls = AtomicU32::new(0);

        for _ in 0..2 {
            assert!(matches!(fail(&breaker, &calls).await, Err(CircuitBreakerError::Upstream("boom"))));
            assert_eq!(breaker.state(), CircuitState::Closed);
        }
        let _ = fail(&breaker, &calls).await;
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let result = succeed(&breaker, &calls).await;
        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.stats.rejected_calls, 1);
        assert_eq!(snapshot.stats.failed_calls, 3);
        assert_eq!(snapshot.failures, 3);
        assert!(snapshot.next_attempt.is_some());
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let breaker = CircuitBreaker::new("test", config(3, 2, 100, 60_000));
        let calls = AtomicU32::new(0);

        let _ = fail(&breaker, &calls).await;
        let _ = fail(&breaker, &calls).await;
        assert_eq!(breaker.snapshot().failures, 2);

        succeed(&breaker, &calls).await.unwrap();
        assert_eq!(breaker.snapshot().failures, 0);

        let _ = fail(&breaker, &calls).await;
        let _ = fail(&breaker, &calls).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_invokes_once_then_closes() {
        let breaker = CircuitBreaker::new("test", config(1, 2, 100, 50));
        let calls = AtomicU32::new(0);

        let _ = fail(&breaker, &calls).await;
        assert_eq!(breaker.state(), CircuitState::Open);
        sleep(Duration::from_millis(70)).await;

        succeed(&breaker, &calls).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert_eq!(breaker.snapshot().successes, 1);

        succeed(&breaker, &calls).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::Closed);
        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.failures, 0);
        assert_eq!(snapshot.successes, 0);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens_with_fresh_deadline() {
        let breaker = CircuitBreaker::new("test", config(1, 2, 100, 50));
        let calls = AtomicU32::new(0);

        let _ = fail(&breaker, &calls).await;
        let first_deadline = breaker.snapshot().next_attempt.unwrap();
        sleep(Duration::from_millis(70)).await;

        let _ = fail(&breaker, &calls).await;
        assert_eq!(breaker.state(), CircuitState::Open);
        let second_deadline = breaker.snapshot().next_attempt.unwrap();
        assert!(second_deadline > first_deadline);

        let result = succeed(&breaker, &calls).await;
        assert!(result.unwrap_err().is_circuit_open());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reset_always_closes() {
        let breaker = CircuitBreaker::new("test", config(1, 2, 100, 60_000));
        let calls = AtomicU32::new(0);

        breaker.reset();
        assert_eq!(breaker.state(), CircuitState::Closed);

        let _ = fail(&breaker, &calls).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        breaker.reset();
        breaker.reset();
        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.failures, 0);
        assert_eq!(snapshot.successes, 0);
        assert!(snapshot.next_attempt.is_none());
        assert_eq!(snapshot.stats.failed_calls, 1);

        assert!(succeed(&breaker, &calls).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_failure_even_if_operation_would_succeed() {
        let breaker = CircuitBreaker::new("test", config(1, 1, 100, 60_000));

        let result = breaker
            .execute(|| async {
                sleep(Duration::from_millis(500)).await;
                Ok::<_, &'static str>("late")
            })
            .await;

        assert!(result.unwrap_err().is_timeout());
        assert_eq!(breaker.state(), CircuitState::Open);

        sleep(Duration::from_secs(1)).await;
        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.stats.successful_calls, 0);
        assert_eq!(snapshot.stats.failed_calls, 1);
        assert_eq!(snapshot.state, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_outcome_from_previous_generation_is_ignored() {
        let breaker = Arc::new(CircuitBreaker::new("test", config(1, 1, 1_000, 60_000)));
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let slow = {
            let breaker = breaker.clone();
            tokio::spawn(async move {
                breaker
                    .execute(|| async move {
                        let _ = release_rx.await;
                        Err::<(), _>("late failure")
                    })
                    .await
            })
        };
        sleep(Duration::from_millis(10)).await;

        breaker.reset();
        let _ = release_tx.send(());
        let result = slow.await.unwrap();

        assert!(matches!(result, Err(CircuitBreakerError::Upstream("late failure"))));
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.snapshot().stats.failed_calls, 1);
    }

    #[tokio::test]
    async fn test_single_probe_while_half_open() {
        let breaker = Arc::new(CircuitBreaker::new("test", config(1, 1, 1_000, 20)));
        let calls = Arc::new(AtomicU32::new(0));

        let _ = fail(&breaker, &calls).await;
        sleep(Duration::from_millis(40)).await;

        let mut handles = Vec::new();
        for _ in 0..5 {
            let breaker = breaker.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                breaker
                    .execute(|| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        sleep(Duration::from_millis(50)).await;
                        Ok::<_, &'static str>(())
                    })
                    .await
            }));
        }

        let mut admitted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => admitted += 1,
                Err(e) if e.is_circuit_open() => rejected += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(admitted, 1);
        assert_eq!(rejected, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_dropped_probe_releases_slot() {
        let breaker = CircuitBreaker::new("test", config(1, 1, 1_000, 10));
        let calls = AtomicU32::new(0);

        let _ = fail(&breaker, &calls).await;
        sleep(Duration::from_millis(20)).await;

        let probe = breaker.execute(|| async {
            sleep(Duration::from_secs(10)).await;
            Ok::<_, &'static str>(0)
        });
        let _ = tokio::time::timeout(Duration::from_millis(10), probe).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        assert_eq!(succeed(&breaker, &calls).await.unwrap(), 7);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_snapshot_serialization_shape() {
        let breaker = CircuitBreaker::new("database", CircuitBreakerConfig::critical());
        let json = serde_json::to_value(breaker.snapshot()).unwrap();

        assert_eq!(json["name"], "database");
        assert_eq!(json["state"], "CLOSED");
        assert_eq!(json["failures"], 0);
        assert_eq!(json["successes"], 0);
        assert!(json["nextAttempt"].is_null());
        assert_eq!(json["stats"]["totalCalls"], 0);
        assert_eq!(json["stats"]["rejectedCalls"], 0);
        assert!(json["stats"]["lastFailure"].is_null());
    }

    #[test]
    fn test_profiles() {
        let critical = CircuitBreakerConfig::critical();
        assert_eq!(critical.timeout, Duration::from_secs(5));
        assert_eq!(critical.recovery_timeout, Duration::from_secs(30));

        let optional = CircuitBreakerConfig::non_critical();
        assert_eq!(optional.failure_threshold, 3);
        assert!(optional.recovery_timeout < critical.recovery_timeout);
    }
}
