//! Cache service: typed get/set, get-or-compute, invalidation, warm-up.
//!
//! # Responsibilities
//! - Serialize values as JSON and store them with a TTL
//! - Route every backend call through the cache store's optional-dependency
//!   breaker so an unhealthy store degrades to misses
//! - Expand domain writes into invalidation patterns
//!
//! # Design Decisions
//! - Cache faults are never surfaced; reads degrade to `None`, writes and
//!   invalidations are best-effort
//! - `null` results are not cached
//! - Invalidation over-approximates: related lists and aggregates are dropped
//!   rather than tracking exact read/write dependencies

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use futures_util::future::{join_all, BoxFuture};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::backend::CacheBackend;
use crate::cache::keys::{self, KeyPrefix};
use crate::cache::ttl::{TtlCategory, TtlPolicy, MAX_TTL_SECS};
use crate::observability::metrics;
use crate::resilience::adapter::OptionalDependency;

/// Boxed error for warm-up fetchers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One key to prefill via [`CacheService::warm_up`].
pub struct WarmUpTask {
    pub key: String,
    /// `None` uses the policy TTL for the key's category.
    pub ttl_secs: Option<u64>,
    fetcher: BoxFuture<'static, Result<serde_json::Value, BoxError>>,
}

impl WarmUpTask {
    pub fn new<Fut, T, E>(key: impl Into<String>, ttl_secs: u64, fetcher: Fut) -> Self
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Serialize + Send,
        E: Into<BoxError> + Send,
    {
        Self::build(key.into(), Some(ttl_secs), fetcher)
    }

    /// Task whose TTL follows the policy for the key's prefix.
    pub fn for_key<Fut, T, E>(key: impl Into<String>, fetcher: Fut) -> Self
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Serialize + Send,
        E: Into<BoxError> + Send,
    {
        Self::build(key.into(), None, fetcher)
    }

    fn build<Fut, T, E>(key: String, ttl_secs: Option<u64>, fetcher: Fut) -> Self
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Serialize + Send,
        E: Into<BoxError> + Send,
    {
        let fetcher = async move {
            let value = fetcher.await.map_err(Into::<BoxError>::into)?;
            Ok::<_, BoxError>(serde_json::to_value(value)?)
        };
        Self {
            key,
            ttl_secs,
            fetcher: Box::pin(fetcher),
        }
    }
}

/// Outcome of a warm-up run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct WarmUpSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Counters exposed on the admin API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub invalidated: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    invalidated: AtomicU64,
}

/// JSON cache over a [`CacheBackend`], protected by an optional-dependency breaker.
pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
    dependency: Arc<OptionalDependency>,
    policy: ArcSwap<TtlPolicy>,
    counters: Counters,
}

impl CacheService {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        dependency: Arc<OptionalDependency>,
        policy: TtlPolicy,
    ) -> Self {
        Self {
            backend,
            dependency,
            policy: ArcSwap::from_pointee(policy),
            counters: Counters::default(),
        }
    }

    /// Join `prefix` and present parts into a key.
    pub fn build_key<'a, I>(prefix: KeyPrefix, parts: I) -> String
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        keys::build_key(prefix, parts)
    }

    pub fn policy(&self) -> TtlPolicy {
        **self.policy.load()
    }

    /// Replace the TTL table. Affects writes made after the swap.
    pub fn set_policy(&self, policy: TtlPolicy) {
        self.policy.store(Arc::new(policy));
        tracing::info!(?policy, "Cache TTL policy updated");
    }

    pub fn ttl_secs(&self, category: TtlCategory) -> u64 {
        self.policy.load().ttl_secs(category)
    }

    /// Policy TTL for the category `key` belongs to.
    pub fn ttl_for_key(&self, key: &str) -> u64 {
        self.ttl_secs(TtlCategory::for_key(key))
    }

    pub fn dependency(&self) -> &Arc<OptionalDependency> {
        &self.dependency
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            invalidated: self.counters.invalidated.load(Ordering::Relaxed),
        }
    }

    /// Fetch and decode `key`. Any fault reads as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self
            .dependency
            .execute(|| self.backend.get(key), None)
            .await;

        // A stored null is never a hit, even for `Option<_>` targets.
        let value = raw
            .filter(|raw| raw.as_str() != "null")
            .and_then(|raw| match serde_json::from_str::<T>(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            });

        let hit = value.is_some();
        let counter = if hit { &self.counters.hits } else { &self.counters.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache_lookup(hit);
        value
    }

    /// Store `value` under `key` for `ttl_secs`. Best-effort.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl_secs: u64) {
        match serde_json::to_string(value) {
            Ok(raw) => self.store_raw(key, raw, ttl_secs).await,
            Err(e) => {
                metrics::record_cache_write("failed");
                tracing::warn!(key = %key, error = %e, "Failed to serialize cache value");
            }
        }
    }

    /// [`CacheService::set`] with the policy TTL for the key's category.
    pub async fn set_for<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        self.set(key, value, self.ttl_for_key(key)).await
    }

    /// Return the cached value for `key`, or compute, store and return it.
    ///
    /// `compute` runs at most once and only on a miss. Its errors propagate;
    /// a failed store does not.
    pub async fn get_or_compute<T, F, Fut, E>(&self, key: &str, compute: F, ttl_secs: u64) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(key).await {
            tracing::trace!(key = %key, "Cache hit");
            return Ok(cached);
        }

        let value = compute().await?;
        match serde_json::to_string(&value) {
            Ok(raw) => self.store_raw(key, raw, ttl_secs).await,
            Err(e) => {
                metrics::record_cache_write("failed");
                tracing::warn!(key = %key, error = %e, "Failed to serialize computed value");
            }
        }
        Ok(value)
    }

    /// [`CacheService::get_or_compute`] with the policy TTL for the key's category.
    pub async fn get_or_compute_for<T, F, Fut, E>(&self, key: &str, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_compute(key, compute, self.ttl_for_key(key)).await
    }

    /// Delete every key matching the glob `pattern`, returning the count.
    pub async fn invalidate(&self, pattern: &str) -> usize {
        let matched = self
            .dependency
            .execute(|| self.backend.keys_matching(pattern), Vec::new())
            .await;
        if matched.is_empty() {
            return 0;
        }

        let deleted = self
            .dependency
            .execute(|| self.backend.delete_many(&matched), 0)
            .await;

        self.counters.invalidated.fetch_add(deleted as u64, Ordering::Relaxed);
        metrics::record_cache_invalidation(deleted);
        tracing::debug!(pattern = %pattern, deleted, "Cache invalidated");
        deleted
    }

    /// Drop everything cached for a user.
    pub async fn invalidate_user(&self, user_id: &str) -> usize {
        self.invalidate_all(keys::user_patterns(user_id)).await
    }

    /// Drop a nutrition entry (or all of the user's entries) and the views derived from it.
    pub async fn invalidate_entry_cache(&self, user_id: &str, entry_id: Option<&str>) -> usize {
        self.invalidate_all(keys::entry_patterns(user_id, entry_id)).await
    }

    /// Drop a workout (or all of the user's workouts) and the views derived from it.
    pub async fn invalidate_workout_cache(&self, user_id: &str, workout_id: Option<&str>) -> usize {
        self.invalidate_all(keys::workout_patterns(user_id, workout_id)).await
    }

    /// Prefill keys concurrently. Failing fetchers are logged and counted.
    pub async fn warm_up(&self, tasks: Vec<WarmUpTask>) -> WarmUpSummary {
        let total = tasks.len();
        let runs = tasks.into_iter().map(|task| async move {
            let WarmUpTask { key, ttl_secs, fetcher } = task;
            let ttl_secs = ttl_secs.unwrap_or_else(|| self.ttl_for_key(&key));
            let result = self.get_or_compute(&key, move || fetcher, ttl_secs).await;
            if let Err(e) = &result {
                tracing::warn!(key = %key, error = %e, "Cache warm-up task failed");
            }
            result.is_ok()
        });

        let outcomes = join_all(runs).await;
        let succeeded = outcomes.iter().filter(|ok| **ok).count();
        let summary = WarmUpSummary {
            succeeded,
            failed: total - succeeded,
        };
        tracing::info!(succeeded = summary.succeeded, failed = summary.failed, "Cache warm-up finished");
        summary
    }

    async fn invalidate_all(&self, patterns: Vec<String>) -> usize {
        let mut total = 0;
        for pattern in &patterns {
            total += self.invalidate(pattern).await;
        }
        total
    }

    async fn store_raw(&self, key: &str, raw: String, ttl_secs: u64) {
        if ttl_secs == 0 {
            metrics::record_cache_write("skipped");
            tracing::debug!(key = %key, "Skipping cache write with zero TTL");
            return;
        }
        if raw == "null" {
            metrics::record_cache_write("skipped");
            tracing::trace!(key = %key, "Not caching null value");
            return;
        }
        if ttl_secs > MAX_TTL_SECS {
            tracing::debug!(key = %key, ttl_secs, max = MAX_TTL_SECS, "Clamping cache TTL");
        }

        let ttl = Duration::from_secs(ttl_secs.min(MAX_TTL_SECS));
        let stored = self
            .dependency
            .execute(|| async { self.backend.set_with_ttl(key, raw, ttl).await.map(|()| true) }, false)
            .await;

        if stored {
            self.counters.writes.fetch_add(1, Ordering::Relaxed);
            metrics::record_cache_write("stored");
        } else {
            metrics::record_cache_write("failed");
        }
    }
}
