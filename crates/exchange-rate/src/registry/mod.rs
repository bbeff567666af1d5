//! Provider registry module.
//!
//! Orchestration of rate providers:
//! - Provider registration and priority ordering
//! - Health caching with optional expiry
//! - Rate limiting per provider
//! - Single-symbol and batch resolution

mod health;
mod rate_limiter;
mod registry;

pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use registry::{RateRegistry, RegistryConfig, DEFAULT_HEALTH_TTL, DEFAULT_MAX_CONCURRENCY};
