//!
//! Embedbatch Server - HTTP surface of the batch embedding service
//!
//! Synchronous embedding, asynchronous job submission and status, and result
//! file serving, behind API key authentication and per-client rate limiting.

/// API module
pub mod api;

/// Configuration module
pub mod config;

/// Error module
pub mod error;

/// Resilience module
pub mod resilience;

/// Server module
pub mod server;

// Re-export key types
pub use api::build_router;
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use resilience::RateLimiter;
pub use server::{run, AppState};
