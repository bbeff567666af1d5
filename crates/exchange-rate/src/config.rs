//! Environment-driven configuration.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use log::warn;

use crate::errors::RateError;
use crate::provider::frankfurter;
use crate::provider::spot::{binance, gateio};
use crate::registry::{RateLimitConfig, RegistryConfig, DEFAULT_HEALTH_TTL, DEFAULT_MAX_CONCURRENCY};

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_EXCHANGE_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_FIAT_CACHE_TTL_SECS: u64 = 300;

/// Settings for the resolution engine and its default providers.
#[derive(Clone, Debug)]
pub struct ExchangeRateConfig {
    pub max_concurrency: usize,
    /// `None` keeps health entries until the next sweep.
    pub health_ttl: Option<Duration>,
    pub request_timeout: Duration,
    pub exchange_cache_ttl: Duration,
    pub fiat_cache_ttl: Duration,
    pub fiat_currency: String,
    pub binance_url: String,
    pub gateio_url: String,
    pub frankfurter_url: String,
    /// HTTP(S) proxy for the exchange clients.
    pub proxy_url: Option<String>,
    pub metrics_enabled: bool,
    /// Additions to, or replacements for, the static fallback table.
    pub fallback_prices: HashMap<String, f64>,
    pub binance_rate_limit: RateLimitConfig,
    pub gateio_rate_limit: RateLimitConfig,
    pub frankfurter_rate_limit: RateLimitConfig,
}

impl Default for ExchangeRateConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            health_ttl: Some(DEFAULT_HEALTH_TTL),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            exchange_cache_ttl: Duration::from_secs(DEFAULT_EXCHANGE_CACHE_TTL_SECS),
            fiat_cache_ttl: Duration::from_secs(DEFAULT_FIAT_CACHE_TTL_SECS),
            fiat_currency: frankfurter::DEFAULT_CURRENCY.to_string(),
            binance_url: binance::DEFAULT_BASE_URL.to_string(),
            gateio_url: gateio::DEFAULT_BASE_URL.to_string(),
            frankfurter_url: frankfurter::DEFAULT_BASE_URL.to_string(),
            proxy_url: None,
            metrics_enabled: true,
            fallback_prices: HashMap::new(),
            binance_rate_limit: RateLimitConfig {
                requests_per_minute: 600,
                burst_capacity: 20.0,
            },
            gateio_rate_limit: RateLimitConfig {
                requests_per_minute: 600,
                burst_capacity: 10.0,
            },
            frankfurter_rate_limit: RateLimitConfig {
                requests_per_minute: 60,
                burst_capacity: 5.0,
            },
        }
    }
}

impl ExchangeRateConfig {
    /// Read `ER_*` variables, loading a `.env` file first if present.
    pub fn from_env() -> Result<Self, RateError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable numbers fall back to
    /// their defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let health_ttl_secs: u64 = parse_or(
            "ER_HEALTH_TTL_SECS",
            var("ER_HEALTH_TTL_SECS"),
            DEFAULT_HEALTH_TTL.as_secs(),
        );

        let config = Self {
            max_concurrency: parse_or(
                "ER_MAX_CONCURRENCY",
                var("ER_MAX_CONCURRENCY"),
                defaults.max_concurrency,
            ),
            health_ttl: (health_ttl_secs > 0).then(|| Duration::from_secs(health_ttl_secs)),
            request_timeout: Duration::from_millis(parse_or(
                "ER_REQUEST_TIMEOUT_MS",
                var("ER_REQUEST_TIMEOUT_MS"),
                DEFAULT_REQUEST_TIMEOUT_MS,
            )),
            exchange_cache_ttl: Duration::from_secs(parse_or(
                "ER_EXCHANGE_CACHE_TTL_SECS",
                var("ER_EXCHANGE_CACHE_TTL_SECS"),
                DEFAULT_EXCHANGE_CACHE_TTL_SECS,
            )),
            fiat_cache_ttl: Duration::from_secs(parse_or(
                "ER_FIAT_CACHE_TTL_SECS",
                var("ER_FIAT_CACHE_TTL_SECS"),
                DEFAULT_FIAT_CACHE_TTL_SECS,
            )),
            fiat_currency: var("ER_FIAT_CURRENCY")
                .map(|c| c.to_uppercase())
                .unwrap_or(defaults.fiat_currency),
            binance_url: var("ER_BINANCE_URL").unwrap_or(defaults.binance_url),
            gateio_url: var("ER_GATEIO_URL").unwrap_or(defaults.gateio_url),
            frankfurter_url: var("ER_FRANKFURTER_URL").unwrap_or(defaults.frankfurter_url),
            proxy_url: var("ER_PROXY_URL"),
            metrics_enabled: var("ER_METRICS_ENABLED")
                .map(|v| parse_bool("ER_METRICS_ENABLED", &v, defaults.metrics_enabled))
                .unwrap_or(defaults.metrics_enabled),
            fallback_prices: var("ER_FALLBACK_PRICES")
                .map(|v| parse_prices(&v))
                .unwrap_or_default(),
            binance_rate_limit: defaults.binance_rate_limit,
            gateio_rate_limit: defaults.gateio_rate_limit,
            frankfurter_rate_limit: defaults.frankfurter_rate_limit,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RateError> {
        if self.max_concurrency == 0 {
            return Err(RateError::Config(
                "ER_MAX_CONCURRENCY must be at least 1".to_string(),
            ));
        }
        if self.fiat_currency.is_empty() {
            return Err(RateError::Config("ER_FIAT_CURRENCY is empty".to_string()));
        }
        Ok(())
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            max_concurrency: self.max_concurrency,
            health_ttl: self.health_ttl,
        }
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, value: Option<String>, default: T) -> T {
    match value {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Invalid {}='{}', using default {}", key, raw, default);
            default
        }),
        None => default,
    }
}

fn parse_bool(key: &str, value: &str, default: bool) -> bool {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!("Invalid {}='{}', using default {}", key, value, default);
            default
        }
    }
}

/// Parse `BTC=65000,ETH=3000`. Malformed pairs are skipped.
fn parse_prices(value: &str) -> HashMap<String, f64> {
    value
        .split(',')
        .filter(|pair| !pair.trim().is_empty())
        .filter_map(|pair| {
            let parsed = pair
                .split_once('=')
                .and_then(|(symbol, price)| {
                    let symbol = symbol.trim().to_uppercase();
                    let price = price.trim().parse::<f64>().ok()?;
                    (!symbol.is_empty()).then_some((symbol, price))
                });
            if parsed.is_none() {
                warn!("Ignoring malformed ER_FALLBACK_PRICES entry '{}'", pair);
            }
            parsed
        })
        .collect()
}
