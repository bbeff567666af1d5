//! Spot-exchange providers.
//!
//! Both exchanges share one provider type, [`SpotExchangeProvider`]; the
//! venue-specific part is the [`TickerSource`] that turns a trading pair
//! into a 24h ticker:
//!
//! - [`binance::BinanceTickers`] - primary source, `USDC` pairs first
//! - [`gateio::GateioTickers`] - secondary source, `USDT` pairs first
//!
//! Stablecoins never hit the network. Other symbols are priced from the
//! preferred quote pair and fall back to the alternate pair.

pub mod binance;
pub mod gateio;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use super::cache::TtlCache;
use super::RateProvider;
use crate::errors::RateError;
use crate::models::{is_stablecoin, normalize_symbol, RateInfo};
use crate::registry::RateLimiter;

/// Coins both exchanges are queried for.
pub const SPOT_SYMBOLS: &[&str] = &[
    "BTC", "ETH", "BNB", "SOL", "XRP", "ADA", "DOGE", "MATIC", "DOT", "SHIB", "TRX", "AVAX",
    "LINK", "ATOM", "UNI", "LTC", "PEPE", "USDC", "USDT", "DAI",
];

/// Symbol used by the health probe.
const CANARY_SYMBOL: &str = "BTC";

/// 24h ticker of one trading pair.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ticker {
    /// Last traded price in the quote asset
    pub last: f64,
    /// 24h change in percent
    pub change_percent: f64,
    /// 24h volume in the base asset
    pub base_volume: f64,
}

/// Venue-specific ticker lookup.
#[async_trait]
pub trait TickerSource: Send + Sync {
    /// Fetch the ticker of `base`/`quote`.
    async fn fetch_ticker(
        &self,
        cancel: &CancellationToken,
        base: &str,
        quote: &str,
    ) -> Result<Ticker, RateError>;
}

/// Price provider backed by a spot exchange.
pub struct SpotExchangeProvider {
    name: String,
    priority: i32,
    /// Quote assets in preference order.
    quotes: Vec<String>,
    tickers: Box<dyn TickerSource>,
    cache: TtlCache,
    limiter: Arc<RateLimiter>,
}

impl SpotExchangeProvider {
    pub fn new(
        name: impl Into<String>,
        priority: i32,
        quotes: &[&str],
        tickers: Box<dyn TickerSource>,
        cache_ttl: Duration,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            quotes: quotes.iter().map(|q| q.to_string()).collect(),
            tickers,
            cache: TtlCache::new(cache_ttl),
            limiter,
        }
    }

    /// Price `symbol` from one pair, consulting the cache first.
    async fn fetch_pair(
        &self,
        cancel: &CancellationToken,
        symbol: &str,
        quote: &str,
    ) -> Result<RateInfo, RateError> {
        let pair = format!("{}/{}", symbol, quote);

        if let Some(rate) = self.cache.get(&pair) {
            debug!("{} cache hit for {}", self.name, pair);
            return Ok(rate);
        }

        self.limiter.wait(cancel, &self.name).await?;
        let ticker = self.tickers.fetch_ticker(cancel, symbol, quote).await?;

        if ticker.last <= 0.0 {
            return Err(RateError::provider(
                &self.name,
                format!("invalid price {} for {}", ticker.last, pair),
            ));
        }

        let rate = RateInfo::new(symbol, ticker.last, format!("{}({})", self.name, pair))
            .with_market(ticker.change_percent, ticker.base_volume);

        self.cache.insert(pair, rate.clone());
        Ok(rate)
    }
}

#[async_trait]
impl RateProvider for SpotExchangeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn fetch_rate(
        &self,
        cancel: &CancellationToken,
        symbol: &str,
    ) -> Result<RateInfo, RateError> {
        let symbol = normalize_symbol(symbol);

        if is_stablecoin(&symbol) {
            return Ok(RateInfo::new(symbol, 1.0, self.name.clone()));
        }

        let mut last_error: Option<RateError> = None;

        for quote in &self.quotes {
            match self.fetch_pair(cancel, &symbol, quote).await {
                Ok(rate) => return Ok(rate),
                Err(RateError::Cancelled) => return Err(RateError::Cancelled),
                Err(e) => {
                    debug!(
                        "{} pair {}/{} failed: {}, trying next quote",
                        self.name, symbol, quote, e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => RateError::provider(
                &self.name,
                format!("failed to fetch {}: {}", symbol, e),
            ),
            None => RateError::UnsupportedSymbol {
                provider: self.name.clone(),
                symbol,
            },
        })
    }

    async fn is_healthy(&self, cancel: &CancellationToken) -> bool {
        match self.fetch_rate(cancel, CANARY_SYMBOL).await {
            Ok(_) => true,
            Err(e) => {
                info!("{} health probe failed: {}", self.name, e);
                false
            }
        }
    }

    fn supported_symbols(&self) -> Vec<String> {
        SPOT_SYMBOLS.iter().map(|s| s.to_string()).collect()
    }

    fn supports_symbol(&self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        SPOT_SYMBOLS.contains(&symbol.as_str())
    }
}
