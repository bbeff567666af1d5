//! Static fallback provider.
//!
//! Last link of the chain. Serves reference prices from an in-memory table
//! so that well-known symbols always resolve, even with every upstream
//! down. Prices are approximate and flagged with `is_fallback`.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::RateProvider;
use crate::errors::RateError;
use crate::models::{normalize_symbol, RateInfo};

pub const PROVIDER_NAME: &str = "Local";
pub const PRIORITY: i32 = 999;

/// Built-in reference prices in USD.
pub const DEFAULT_PRICES: &[(&str, f64)] = &[
    ("USDT", 1.0),
    ("USDC", 1.0),
    ("DAI", 1.0),
    ("BTC", 100_000.0),
    ("ETH", 3_500.0),
    ("BNB", 650.0),
    ("SOL", 200.0),
    ("XRP", 2.5),
    ("ADA", 1.0),
    ("DOGE", 0.35),
    ("MATIC", 0.5),
    ("DOT", 7.0),
    ("SHIB", 0.000024),
    ("TRX", 0.25),
    ("AVAX", 40.0),
    ("LINK", 20.0),
    ("ATOM", 8.0),
    ("UNI", 10.0),
    ("LTC", 100.0),
    ("PEPE", 0.000018),
    // 1 CNY ~ 0.14 USD
    ("CNY", 0.14),
];

/// Provider answering from a fixed price table.
pub struct StaticFallbackProvider {
    prices: BTreeMap<String, f64>,
}

impl StaticFallbackProvider {
    /// Provider with the built-in table.
    pub fn new() -> Self {
        Self::with_overrides(&HashMap::new())
    }

    /// Built-in table with entries added or replaced.
    ///
    /// Keys are normalized; non-positive or non-finite prices are ignored.
    pub fn with_overrides(overrides: &HashMap<String, f64>) -> Self {
        let mut prices: BTreeMap<String, f64> = DEFAULT_PRICES
            .iter()
            .map(|(symbol, price)| (symbol.to_string(), *price))
            .collect();

        for (symbol, price) in overrides {
            if price.is_finite() && *price > 0.0 {
                prices.insert(normalize_symbol(symbol), *price);
            } else {
                log::warn!("Ignoring fallback price {} for {}", price, symbol);
            }
        }

        Self { prices }
    }

    fn rate(&self, symbol: &str, price: f64) -> RateInfo {
        RateInfo::new(symbol, price, PROVIDER_NAME).as_fallback()
    }
}

impl Default for StaticFallbackProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateProvider for StaticFallbackProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    async fn fetch_rate(
        &self,
        _cancel: &CancellationToken,
        symbol: &str,
    ) -> Result<RateInfo, RateError> {
        let symbol = normalize_symbol(symbol);
        match self.prices.get(&symbol) {
            Some(price) => Ok(self.rate(&symbol, *price)),
            None => Err(RateError::UnsupportedSymbol {
                provider: PROVIDER_NAME.to_string(),
                symbol,
            }),
        }
    }

    async fn fetch_rates(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<HashMap<String, RateInfo>, RateError> {
        Ok(self
            .prices
            .iter()
            .map(|(symbol, price)| (symbol.clone(), self.rate(symbol, *price)))
            .collect())
    }

    async fn is_healthy(&self, _cancel: &CancellationToken) -> bool {
        true
    }

    fn supported_symbols(&self) -> Vec<String> {
        self.prices.keys().cloned().collect()
    }

    fn supports_symbol(&self, symbol: &str) -> bool {
        self.prices.contains_key(&normalize_symbol(symbol))
    }
}
