//! Liveness probes for dependencies.
//!
//! # Responsibilities
//! - Define the minimal ping capability a health check needs
//! - Provide a TCP connect probe for network dependencies
//! - Expose a cache backend's own ping as a probe

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::TcpStream;

use crate::cache::backend::CacheBackend;

/// Errors reported by a liveness probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The dependency could not be reached.
    #[error("connection to {address} failed: {reason}")]
    Connect { address: String, reason: String },

    /// The dependency answered but reported itself unhealthy.
    #[error("dependency unhealthy: {0}")]
    Unhealthy(String),
}

/// Minimal liveness capability.
///
/// Timeouts are enforced by the circuit breaker the probe runs under.
#[async_trait]
pub trait PingClient: Send + Sync {
    async fn ping(&self) -> Result<(), ProbeError>;
}

/// Probe that succeeds when a TCP connection can be established.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl PingClient for TcpProbe {
    async fn ping(&self) -> Result<(), ProbeError> {
        TcpStream::connect(&self.address)
            .await
            .map(|_| ())
            .map_err(|e| ProbeError::Connect {
                address: self.address.clone(),
                reason: e.to_string(),
            })
    }
}

/// Probe that delegates to a cache backend's ping.
#[derive(Clone)]
pub struct CacheBackendProbe {
    backend: Arc<dyn CacheBackend>,
}

impl CacheBackendProbe {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl PingClient for CacheBackendProbe {
    async fn ping(&self) -> Result<(), ProbeError> {
        self.backend
            .ping()
            .await
            .map_err(|e| ProbeError::Unhealthy(e.to_string()))
    }
}
