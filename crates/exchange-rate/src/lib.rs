//! AllFi Exchange-Rate Crate
//!
//! Resolves USD prices for crypto assets and fiat currencies from a chain
//! of interchangeable upstream providers.
//!
//! # Overview
//!
//! - Priority-ordered providers with automatic failover
//! - Cached provider health, skipped when unhealthy
//! - Bounded-concurrency batch resolution
//! - Per-provider call metrics (Prometheus)
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |   RateRegistry   |  fetch_rate / fetch_rates
//! +------------------+
//!          |
//!          v   in priority order, skipping unhealthy providers
//! +------------------+     +------------------+
//! |   RateProvider   | --> |   RateLimiter    |
//! +------------------+     +------------------+
//!   Binance      (1)
//!   Gate.io      (2)
//!   Frankfurter  (3)
//!   Local      (999)
//!          |
//!          v
//! +------------------+
//! |     RateInfo     |  price + source, plus warnings
//! +------------------+
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use allfi_exchange_rate::{ExchangeRateConfig, NoopMetrics, RateRegistry};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = ExchangeRateConfig::from_env()?;
//! let registry = RateRegistry::with_default_providers(&config, Arc::new(NoopMetrics))?;
//! let resolution = registry.fetch_rate(&CancellationToken::new(), "BTC").await?;
//! println!("{} via {}", resolution.rate.price_usd, resolution.rate.source);
//! ```

pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod provider;
pub mod registry;

pub use config::ExchangeRateConfig;
pub use errors::RateError;
pub use metrics::{CallOutcome, NoopMetrics, PrometheusMetrics, RateMetrics};
pub use models::{
    is_stablecoin, normalize_symbol, BatchResolution, ProviderSummary, RateInfo, Resolution,
    STABLECOINS,
};
pub use provider::{
    FiatRateProvider, RateProvider, SpotExchangeProvider, StaticFallbackProvider, TickerSource,
};
pub use registry::{RateLimitConfig, RateLimiter, RateRegistry, RegistryConfig};
