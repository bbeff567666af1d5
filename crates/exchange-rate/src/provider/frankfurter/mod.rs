//! Frankfurter fiat-rate provider.
//!
//! Frankfurter publishes ECB reference rates. The provider is configured
//! for exactly one fiat currency and prices it in USD by inverting the
//! `USD -> <fiat>` rate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::cache::TtlCache;
use super::http::{build_client, get_json};
use super::RateProvider;
use crate::errors::RateError;
use crate::models::{normalize_symbol, RateInfo};
use crate::registry::RateLimiter;

pub const PROVIDER_NAME: &str = "Frankfurter";
pub const PRIORITY: i32 = 3;
pub const DEFAULT_BASE_URL: &str = "https://api.frankfurter.dev";
pub const DEFAULT_CURRENCY: &str = "CNY";

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

/// Fiat currency priced through the Frankfurter API.
pub struct FiatRateProvider {
    client: Client,
    base_url: String,
    currency: String,
    cache: TtlCache,
    limiter: Arc<RateLimiter>,
}

impl FiatRateProvider {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        currency: &str,
        cache_ttl: Duration,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            currency: normalize_symbol(currency),
            cache: TtlCache::new(cache_ttl),
            limiter,
        }
    }

    /// Build the provider with its own HTTP client.
    pub fn from_settings(
        base_url: &str,
        currency: &str,
        timeout: Duration,
        cache_ttl: Duration,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, RateError> {
        let client = build_client(timeout, None)?;
        Ok(Self::new(client, base_url, currency, cache_ttl, limiter))
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    async fn fetch_latest(&self, cancel: &CancellationToken) -> Result<RateInfo, RateError> {
        self.limiter.wait(cancel, PROVIDER_NAME).await?;

        let url = format!("{}/v1/latest", self.base_url);
        let response: LatestResponse = get_json(
            &self.client,
            PROVIDER_NAME,
            cancel,
            &url,
            &[("base", "USD"), ("symbols", self.currency.as_str())],
        )
        .await?;

        let rate = response
            .rates
            .get(&self.currency)
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or_else(|| {
                RateError::provider(PROVIDER_NAME, format!("no {} rate in response", self.currency))
            })?;

        Ok(RateInfo::new(&self.currency, 1.0 / rate, PROVIDER_NAME))
    }
}

#[async_trait]
impl RateProvider for FiatRateProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    async fn fetch_rate(
        &self,
        cancel: &CancellationToken,
        symbol: &str,
    ) -> Result<RateInfo, RateError> {
        let symbol = normalize_symbol(symbol);
        if symbol != self.currency {
            return Err(RateError::UnsupportedSymbol {
                provider: PROVIDER_NAME.to_string(),
                symbol,
            });
        }

        if let Some(rate) = self.cache.get(&symbol) {
            debug!("{} cache hit for {}", PROVIDER_NAME, symbol);
            return Ok(rate);
        }

        let rate = self.fetch_latest(cancel).await?;
        self.cache.insert(symbol, rate.clone());
        Ok(rate)
    }

    async fn fetch_rates(
        &self,
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, RateInfo>, RateError> {
        let rate = self.fetch_rate(cancel, &self.currency).await?;
        Ok(HashMap::from([(self.currency.clone(), rate)]))
    }

    async fn is_healthy(&self, cancel: &CancellationToken) -> bool {
        self.fetch_rate(cancel, &self.currency).await.is_ok()
    }

    fn supported_symbols(&self) -> Vec<String> {
        vec![self.currency.clone()]
    }

    fn supports_symbol(&self, symbol: &str) -> bool {
        normalize_symbol(symbol) == self.currency
    }
}
