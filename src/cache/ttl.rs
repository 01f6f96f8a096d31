//! TTL policy table.
//!
//! Short TTLs for volatile lists, long TTLs for aggregates that change rarely,
//! very short TTLs for auth-sensitive artifacts.

use serde::{Deserialize, Serialize};

use crate::cache::keys::KeyPrefix;

/// Longest TTL any category may use: 30 days.
pub const MAX_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Shape of the cached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlCategory {
    /// A single resource (profile, entry, workout).
    Resource,
    List,
    Paginated,
    /// Aggregate statistics.
    Stats,
    /// Sessions and other auth artifacts.
    Auth,
}

impl TtlCategory {
    /// Default category for keys under `prefix`.
    pub fn for_prefix(prefix: KeyPrefix) -> Self {
        match prefix {
            KeyPrefix::User | KeyPrefix::Entry | KeyPrefix::Workout => TtlCategory::Resource,
            KeyPrefix::List => TtlCategory::List,
            KeyPrefix::Paginated => TtlCategory::Paginated,
            KeyPrefix::Stats => TtlCategory::Stats,
        }
    }

    /// Category for an existing key. Session keys are auth artifacts; unknown
    /// prefixes are treated as single resources.
    pub fn for_key(key: &str) -> Self {
        match KeyPrefix::of_key(key) {
            Some(KeyPrefix::User) if key.split(':').nth(2) == Some("session") => TtlCategory::Auth,
            Some(prefix) => Self::for_prefix(prefix),
            None => TtlCategory::Resource,
        }
    }
}

/// TTL in seconds per category. Loaded from `[cache.ttl]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlPolicy {
    pub resource_secs: u64,
    pub list_secs: u64,
    pub paginated_secs: u64,
    pub stats_secs: u64,
    pub auth_secs: u64,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            resource_secs: 900,
            list_secs: 300,
            paginated_secs: 180,
            stats_secs: 3600,
            auth_secs: 60,
        }
    }
}

impl TtlPolicy {
    pub fn ttl_secs(&self, category: TtlCategory) -> u64 {
        match category {
            TtlCategory::Resource => self.resource_secs,
            TtlCategory::List => self.list_secs,
            TtlCategory::Paginated => self.paginated_secs,
            TtlCategory::Stats => self.stats_secs,
            TtlCategory::Auth => self.auth_secs,
        }
    }

    fn entries(&self) -> [(&'static str, u64); 5] {
        [
            ("resource_secs", self.resource_secs),
            ("list_secs", self.list_secs),
            ("paginated_secs", self.paginated_secs),
            ("stats_secs", self.stats_secs),
            ("auth_secs", self.auth_secs),
        ]
    }

    /// Category names whose TTL is zero.
    pub fn zero_entries(&self) -> Vec<&'static str> {
        self.entries()
            .into_iter()
            .filter(|(_, secs)| *secs == 0)
            .map(|(name, _)| name)
            .collect()
    }

    /// Category names whose TTL exceeds [`MAX_TTL_SECS`].
    pub fn oversized_entries(&self) -> Vec<&'static str> {
        self.entries()
            .into_iter()
            .filter(|(_, secs)| *secs > MAX_TTL_SECS)
            .map(|(name, _)| name)
            .collect()
    }
}
