//! Caching subsystem.
//!
//! # Data Flow
//! ```text
//! Read path:
//!     caller → service.rs get_or_compute(key)
//!         → OptionalDependency breaker → backend.rs get
//!         → miss: compute (e.g. critical datastore call) → set with TTL from ttl.rs
//!
//! Write path:
//!     caller writes to datastore
//!     → service.rs invalidate_* helpers
//!     → keys.rs patterns → backend keys_matching + delete_many
//! ```
//!
//! # Design Decisions
//! - Backends are a narrow capability trait; memory.rs is the in-process store
//! - Unavailable cache means a miss, never an error
//! - Invalidation is not transactional with the triggering write

pub mod backend;
pub mod keys;
pub mod memory;
pub mod service;
pub mod ttl;

pub use backend::{CacheBackend, CacheError};
pub use memory::InMemoryCacheBackend;
pub use service::{CacheService, CacheStats, WarmUpSummary, WarmUpTask};
pub use ttl::{TtlCategory, TtlPolicy, MAX_TTL_SECS};
