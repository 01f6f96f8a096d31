//! HTTP boundary.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, tracing)
//!     → handlers.rs (/health, /health/ready, /health/live)
//!     → admin (bearer-protected breaker and cache operations)
//! ```

pub mod handlers;
pub mod server;

pub use server::{AppState, HttpServer};
