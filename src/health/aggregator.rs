//! Health check aggregation.
//!
//! # Responsibilities
//! - Probe every registered dependency concurrently
//! - Derive overall status from dependency criticality
//! - Keep the latest report for diagnostics
//! - Administrative breaker inspection and reset

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time;

use crate::health::probe::PingClient;
use crate::observability::metrics;
use crate::resilience::adapter::{Criticality, DependencyAdapter};
use crate::resilience::circuit_breaker::{CircuitBreakerSnapshot, CircuitState};

/// Aggregate service health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl OverallStatus {
    /// Healthy and degraded services still take traffic.
    pub fn is_serving(&self) -> bool {
        !matches!(self, OverallStatus::Unhealthy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyReport {
    pub status: DependencyStatus,
    pub criticality: Criticality,
    pub response_time_ms: u64,
    pub circuit_state: CircuitState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: OverallStatus,
    pub timestamp: DateTime<Utc>,
    pub dependencies: BTreeMap<String, DependencyReport>,
    pub circuit_breakers: Vec<CircuitBreakerSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub ready: bool,
    pub timestamp: DateTime<Utc>,
    pub checks: BTreeMap<String, DependencyStatus>,
}

/// Reports are keyed by dependency name, so names must be unique.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dependency '{0}' is already registered")]
pub struct DuplicateDependency(pub String);

/// Overall status by precedence: any critical down, then any optional down.
pub fn derive_status<I>(results: I) -> OverallStatus
where
    I: IntoIterator<Item = (Criticality, DependencyStatus)>,
{
    let mut status = OverallStatus::Healthy;
    for (criticality, dependency) in results {
        if dependency == DependencyStatus::Down {
            match criticality {
                Criticality::Critical => return OverallStatus::Unhealthy,
                Criticality::NonCritical => status = OverallStatus::Degraded,
            }
        }
    }
    status
}

struct MonitoredDependency {
    adapter: Arc<dyn DependencyAdapter>,
    client: Arc<dyn PingClient>,
}

impl MonitoredDependency {
    async fn probe(&self) -> (String, DependencyReport) {
        let started = Instant::now();
        let health = self.adapter.health_check(self.client.as_ref()).await;
        let elapsed = started.elapsed();
        let name = self.adapter.name().to_string();

        metrics::record_dependency_health(&name, health.healthy, elapsed);
        if !health.healthy {
            tracing::warn!(
                dependency = %name,
                state = %health.state,
                error = health.error.as_deref().unwrap_or("unknown"),
                "Dependency health check failed"
            );
        }

        let report = DependencyReport {
            status: if health.healthy { DependencyStatus::Up } else { DependencyStatus::Down },
            criticality: self.adapter.criticality(),
            response_time_ms: elapsed.as_millis() as u64,
            circuit_state: health.state,
            detail: health.error,
        };
        (name, report)
    }
}

/// Probes every registered dependency adapter and reports aggregate health.
#[derive(Default)]
pub struct HealthCheckAggregator {
    dependencies: Vec<MonitoredDependency>,
    latest: RwLock<Option<HealthReport>>,
}

impl HealthCheckAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter`, probed through `client`.
    pub fn with_dependency(
        mut self,
        adapter: Arc<dyn DependencyAdapter>,
        client: Arc<dyn PingClient>,
    ) -> Result<Self, DuplicateDependency> {
        if self.dependencies.iter().any(|d| d.adapter.name() == adapter.name()) {
            return Err(DuplicateDependency(adapter.name().to_string()));
        }
        self.dependencies.push(MonitoredDependency { adapter, client });
        Ok(self)
    }

    pub fn dependency_names(&self) -> Vec<&str> {
        self.dependencies.iter().map(|d| d.adapter.name()).collect()
    }

    /// Probe all dependencies concurrently and build a fresh report.
    pub async fn check(&self) -> HealthReport {
        let results = join_all(self.dependencies.iter().map(|d| d.probe())).await;
        let status = derive_status(results.iter().map(|(_, r)| (r.criticality, r.status)));

        let report = HealthReport {
            status,
            timestamp: Utc::now(),
            dependencies: results.into_iter().collect(),
            circuit_breakers: self.circuit_breaker_stats(),
        };

        tracing::debug!(status = ?report.status, "Health check completed");
        if let Ok(mut latest) = self.latest.write() {
            *latest = Some(report.clone());
        }
        report
    }

    /// Ready iff every critical dependency is up. Optional ones are not probed.
    pub async fn readiness(&self) -> ReadinessReport {
        let critical = self
            .dependencies
            .iter()
            .filter(|d| d.adapter.criticality() == Criticality::Critical);
        let results = join_all(critical.map(|d| d.probe())).await;

        let ready = results.iter().all(|(_, r)| r.status == DependencyStatus::Up);
        ReadinessReport {
            ready,
            timestamp: Utc::now(),
            checks: results.into_iter().map(|(name, r)| (name, r.status)).collect(),
        }
    }

    /// Report from the most recent [`HealthCheckAggregator::check`].
    pub fn latest_report(&self) -> Option<HealthReport> {
        self.latest.read().ok().and_then(|latest| latest.clone())
    }

    /// Snapshots of every breaker. Administrative.
    pub fn circuit_breaker_stats(&self) -> Vec<CircuitBreakerSnapshot> {
        self.dependencies
            .iter()
            .map(|d| d.adapter.breaker().snapshot())
            .collect()
    }

    /// Force every breaker closed. Administrative; bypasses failure accounting.
    pub fn reset_circuit_breakers(&self) -> Vec<CircuitBreakerSnapshot> {
        for dependency in &self.dependencies {
            dependency.adapter.breaker().reset();
        }
        tracing::warn!(count = self.dependencies.len(), "All circuit breakers reset by operator");
        self.circuit_breaker_stats()
    }

    /// Run periodic checks until shutdown.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = interval.as_secs(),
            dependencies = self.dependencies.len(),
            "Health monitor starting"
        );
        let mut ticker = time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.check().await;
                    if report.status != OverallStatus::Healthy {
                        tracing::warn!(status = ?report.status, "Service health is not nominal");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::probe::ProbeError;
    use crate::resilience::adapter::{CriticalDependency, OptionalDependency};
    use crate::resilience::circuit_breaker::CircuitBreakerConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Switch(AtomicBool);

    impl Switch {
        fn new(up: bool) -> Arc<Self> {
            Arc::new(Self(AtomicBool::new(up)))
        }
    }

    #[async_trait]
    impl PingClient for Switch {
        async fn ping(&self) -> Result<(), ProbeError> {
            if self.0.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(ProbeError::Unhealthy("down".into()))
            }
        }
    }

    fn aggregator(db: Arc<Switch>, cache: Arc<Switch>) -> HealthCheckAggregator {
        HealthCheckAggregator::new()
            .with_dependency(
                Arc::new(CriticalDependency::new("database", CircuitBreakerConfig::critical())),
                db,
            )
            .unwrap()
            .with_dependency(
                Arc::new(OptionalDependency::new("cache", CircuitBreakerConfig::non_critical())),
                cache,
            )
            .unwrap()
    }

    #[test]
    fn test_derive_status_precedence() {
        use Criticality::*;
        use DependencyStatus::*;

        assert_eq!(derive_status([(Critical, Up), (NonCritical, Up)]), OverallStatus::Healthy);
        assert_eq!(derive_status([(Critical, Up), (NonCritical, Down)]), OverallStatus::Degraded);
        assert_eq!(derive_status([(NonCritical, Down), (Critical, Down)]), OverallStatus::Unhealthy);
        assert_eq!(derive_status(Vec::<(Criticality, DependencyStatus)>::new()), OverallStatus::Healthy);
        assert!(OverallStatus::Degraded.is_serving());
        assert!(!OverallStatus::Unhealthy.is_serving());
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let err = aggregator(Switch::new(true), Switch::new(true))
            .with_dependency(
                Arc::new(OptionalDependency::new("cache", CircuitBreakerConfig::non_critical())),
                Switch::new(false),
            )
            .err();
        assert_eq!(err, Some(DuplicateDependency("cache".into())));
    }

    #[tokio::test]
    async fn test_check_reports_each_dependency() {
        let health = aggregator(Switch::new(true), Switch::new(false));
        assert!(health.latest_report().is_none());

        let report = health.check().await;
        assert_eq!(report.status, OverallStatus::Degraded);
        assert_eq!(report.dependencies["database"].status, DependencyStatus::Up);
        assert_eq!(report.dependencies["cache"].status, DependencyStatus::Down);
        assert_eq!(report.dependencies["cache"].detail.as_deref(), Some("upstream error: dependency unhealthy: down"));
        assert_eq!(report.circuit_breakers.len(), 2);
        assert_eq!(health.latest_report().unwrap().status, OverallStatus::Degraded);
    }

    #[tokio::test]
    async fn test_critical_down_is_unhealthy_and_not_ready() {
        let db = Switch::new(false);
        let health = aggregator(db.clone(), Switch::new(true));

        assert_eq!(health.check().await.status, OverallStatus::Unhealthy);
        let readiness = health.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.checks.len(), 1);

        db.0.store(true, Ordering::SeqCst);
        assert!(health.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_readiness_ignores_optional_dependencies() {
        let health = aggregator(Switch::new(true), Switch::new(false));
        let readiness = health.readiness().await;
        assert!(readiness.ready);
        assert_eq!(readiness.checks.get("database"), Some(&DependencyStatus::Up));
        assert!(!readiness.checks.contains_key("cache"));
    }

    #[tokio::test]
    async fn test_reset_circuit_breakers() {
        let health = aggregator(Switch::new(true), Switch::new(false));
        for _ in 0..3 {
            health.check().await;
        }
        let cache = health
            .circuit_breaker_stats()
            .into_iter()
            .find(|s| s.name == "cache")
            .unwrap();
        assert_eq!(cache.state, CircuitState::Open);

        let snapshots = health.reset_circuit_breakers();
        assert!(snapshots.iter().all(|s| s.state == CircuitState::Closed && s.failures == 0));
        let again = health.reset_circuit_breakers();
        assert!(again.iter().all(|s| s.state == CircuitState::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let health = Arc::new(aggregator(Switch::new(true), Switch::new(true)));
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(health.clone().run(Duration::from_secs(10), rx));

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(health.latest_report().unwrap().status, OverallStatus::Healthy);

        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
