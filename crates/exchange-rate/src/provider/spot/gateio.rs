//! Gate.io spot tickers.
//!
//! Secondary exchange, used when Binance is unhealthy or lacks a pair.
//! `/api/v4/spot/tickers?currency_pair=BTC_USDT` answers with a one-element
//! array.

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

pub const PROVIDER_NAME: &str = "Gate.io";
pub const PRIORITY: i32 = 2;
pub const DEFAULT_BASE_URL: &str = "https://api.gateio.ws";

const QUOTES: &[&str] = &["USDT", "USDC"];

#[derive(Debug, Deserialize)]
struct SpotTicker {
    currency_pair: Option<String>,
    last: Option<String>,
    change_percentage: Option<String>,
    base_volume: Option<String>,
}

/// Ticker lookups against the Gate.io v4 REST API.
pub struct GateioTickers {
    client: Client,
    base_url: String,
}

impl GateioTickers {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TickerSource for GateioTickers {
    async fn fetch_ticker(
        &self,
        cancel: &CancellationToken,
        base: &str,
        quote: &str,
    ) -> Result<Ticker, RateError> {
        let url = format!("{}/api/v4/spot/tickers", self.base_url);
        let pair = format!("{}_{}", base, quote);

        let tickers: Vec<SpotTicker> = get_json(
            &self.client,
            PROVIDER_NAME,
            cancel,
            &url,
            &[("currency_pair", pair.as_str())],
        )
        .await?;

        let ticker = tickers
            .into_iter()
            .find(|t| t.currency_pair.as_deref().map_or(true, |p| p == pair))
            .ok_or_else(|| RateError::provider(PROVIDER_NAME, format!("no ticker for {}", pair)))?;

        let last = parse_number(ticker.last.as_deref()).ok_or_else(|| {
            RateError::provider(PROVIDER_NAME, format!("no last price for {}", pair))
        })?;

        Ok(Ticker {
            last,
            change_percent: parse_number(ticker.change_percentage.as_deref()).unwrap_or(0.0),
            base_volume: parse_number(ticker.base_volume.as_deref()).unwrap_or(0.0),
        })
    }
}

/// Build the secondary spot-exchange provider.
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
        Box::new(GateioTickers::new(client, base_url)),
        cache_ttl,
        limiter,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::RateProvider;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_parses_ticker_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/spot/tickers"))
            .and(query_param("currency_pair", "ETH_USDT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "currency_pair": "ETH_USDT",
                "last": "3501.2",
                "change_percentage": "0.8",
                "base_volume": "9876.5"
            }])))
            .mount(&server)
            .await;

        let provider = provider(
            &server.uri(),
            Duration::from_secs(5),
            None,
            Duration::from_secs(60),
            Arc::new(RateLimiter::new()),
        )
        .unwrap();

        let rate = provider
            .fetch_rate(&CancellationToken::new(), "eth")
            .await
            .unwrap();
        assert_eq!(rate.price_usd, 3501.2);
        assert_eq!(rate.change_24h, 0.8);
        assert_eq!(rate.volume_24h, 9876.5);
        assert_eq!(rate.source, "Gate.io(ETH/USDT)");
        assert_eq!(provider.priority(), 2);
    }

    #[tokio::test]
    async fn test_empty_array_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/spot/tickers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let tickers = GateioTickers::new(Client::new(), server.uri());
        let err = tickers
            .fetch_ticker(&CancellationToken::new(), "BTC", "USDT")
            .await
            .unwrap_err();
        assert_eq!(err.provider_name(), Some(PROVIDER_NAME));
        assert!(err.to_string().contains("BTC_USDT"));
    }

    #[tokio::test]
    async fn test_http_error_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/spot/tickers"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "label": "INVALID_CURRENCY_PAIR",
                "message": "Invalid currency pair"
            })))
            .mount(&server)
            .await;

        let tickers = GateioTickers::new(Client::new(), server.uri());
        let err = tickers
            .fetch_ticker(&CancellationToken::new(), "FOO", "USDT")
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("400"));
        assert!(text.contains("INVALID_CURRENCY_PAIR"));
    }
}
