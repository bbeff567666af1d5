//! Binance spot tickers.
//!
//! Uses the public `/api/v3/ticker/24hr` endpoint, which needs no API key.
//! Pairs are concatenated without a separator (`BTCUSDC`) and every numeric
//! field arrives as a string.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::{SpotExchangeProvider, Ticker, TickerSource};
use crate::errors::RateError;
use crate::provider::http::{build_client, get_json, parse_number};
use crate::registry::RateLimiter;

pub const PROVIDER_NAME: &str = "Binance";
pub const PRIORITY: i32 = 1;
pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Quote assets in preference order.
const QUOTES: &[&str] = &["USDC", "USDT"];

/// Response from /api/v3/ticker/24hr
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24hResponse {
    last_price: Option<String>,
    price_change_percent: Option<String>,
    volume: Option<String>,
}

/// Ticker lookups against the Binance REST API.
pub struct BinanceTickers {
    client: Client,
    base_url: String,
}

impl BinanceTickers {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn market_symbol(base: &str, quote: &str) -> String {
        format!("{}{}", base, quote)
    }
}

#[async_trait]
impl TickerSource for BinanceTickers {
    async fn fetch_ticker(
        &self,
        cancel: &CancellationToken,
        base: &str,
        quote: &str,
    ) -> Result<Ticker, RateError> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let market = Self::market_symbol(base, quote);

        let response: Ticker24hResponse = get_json(
            &self.client,
            PROVIDER_NAME,
            cancel,
            &url,
            &[("symbol", market.as_str())],
        )
        .await?;

        let last = parse_number(response.last_price.as_deref()).ok_or_else(|| {
            RateError::provider(PROVIDER_NAME, format!("no last price for {}", market))
        })?;

        Ok(Ticker {
            last,
            change_percent: parse_number(response.price_change_percent.as_deref()).unwrap_or(0.0),
            base_volume: parse_number(response.volume.as_deref()).unwrap_or(0.0),
        })
    }
}

/// Build the primary spot-exchange provider.
pub fn provider(
    base_url: &str,
    timeout: Duration,
    proxy: Option<&str>,
    cache_ttl: Duration,
    limiter: Arc<RateLimiter>,
) -> Result<SpotExchangeProvider, RateError> {
    let client = build_client(timeout, proxy)?;
    Ok(SpotExchangeProvider::new(
        PROVIDER_NAME,
        PRIORITY,
        QUOTES,
        Box::new(BinanceTickers::new(client, base_url)),
        cache_ttl,
        limiter,
    ))
}
