//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracker_resilience::cache::{CacheBackend, CacheError, InMemoryCacheBackend};
use tracker_resilience::config::AppConfig;
use tracker_resilience::health::{PingClient, ProbeError};
use tracker_resilience::lifecycle::startup::{build_context_with, AppContext};

pub const ADMIN_KEY: &str = "test-admin-key";

/// In-memory store that can be switched off to simulate an outage.
#[derive(Default)]
pub struct FlakyBackend {
    inner: InMemoryCacheBackend,
    down: AtomicBool,
    calls: AtomicUsize,
}

impl FlakyBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Operations that reached the store, failed or not.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheBackend for FlakyBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.enter()?;
        self.inner.get(key).await
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.enter()?;
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        self.enter()?;
        self.inner.keys_matching(pattern).await
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize, CacheError> {
        self.enter()?;
        self.inner.delete_many(keys).await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.enter()
    }
}

/// Ping client with a switch and a call counter.
pub struct CountingPing {
    up: AtomicBool,
    calls: AtomicUsize,
}

impl CountingPing {
    pub fn new(up: bool) -> Arc<Self> {
        Arc::new(Self {
            up: AtomicBool::new(up),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PingClient for CountingPing {
    async fn ping(&self) -> Result<(), ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.up.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ProbeError::Unhealthy("primary store refused connection".into()))
        }
    }
}

/// Defaults with the admin API on and background features off.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.bind_address = "127.0.0.1:0".into();
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.into();
    config.observability.metrics_enabled = false;
    config.health.enabled = false;
    config
}

/// Context whose primary store is probed through `database`.
pub fn context(config: AppConfig, database: Arc<CountingPing>) -> Arc<AppContext> {
    Arc::new(build_context_with(config, InMemoryCacheBackend::new(), database).unwrap())
}
