use std::sync::Arc;
use std::time::{Duration, Instant};

use allfi_exchange_rate::{
    CallOutcome, ExchangeRateConfig, NoopMetrics, PrometheusMetrics, RateError, RateRegistry,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Upstreams {
    binance: MockServer,
    gateio: MockServer,
    frankfurter: MockServer,
}

impl Upstreams {
    async fn start() -> Self {
        Self {
            binance: MockServer::start().await,
            gateio: MockServer::start().await,
            frankfurter: MockServer::start().await,
        }
    }

    fn config(&self) -> ExchangeRateConfig {
        ExchangeRateConfig {
            binance_url: self.binance.uri(),
            gateio_url: self.gateio.uri(),
            frankfurter_url: self.frankfurter.uri(),
            ..ExchangeRateConfig::default()
        }
    }

    async fn binance_ticker(&self, market: &str, last: &str) {
        Mock::given(method("GET"))
            .and(path("/api/v3/ticker/24hr"))
            .and(query_param("symbol", market))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "symbol": market,
                "lastPrice": last,
                "priceChangePercent": "1.0",
                "volume": "10"
            })))
            .mount(&self.binance)
            .await;
    }

    async fn gateio_ticker(&self, pair: &str, last: &str) {
        Mock::given(method("GET"))
            .and(path("/api/v4/spot/tickers"))
            .and(query_param("currency_pair", pair))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "currency_pair": pair,
                "last": last,
                "change_percentage": "-0.5",
                "base_volume": "20"
            }])))
            .mount(&self.gateio)
            .await;
    }

    async fn frankfurter_rate(&self, rate: f64) {
        Mock::given(method("GET"))
            .and(path("/v1/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "base": "USD",
                "date": "2026-10-16",
                "rates": {"CNY": rate}
            })))
            .mount(&self.frankfurter)
            .await;
    }

    /// Everything not mounted explicitly answers 500.
    async fn fail_rest(&self) {
        for server in [&self.binance, &self.gateio, &self.frankfurter] {
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
                .mount(server)
                .await;
        }
    }
}

fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn healthy_chain_prefers_primary_exchange() {
    let upstreams = Upstreams::start().await;
    upstreams.binance_ticker("BTCUSDC", "42000.5").await;
    upstreams.binance_ticker("ETHUSDC", "3500.25").await;
    upstreams.frankfurter_rate(7.0).await;
    upstreams.fail_rest().await;

    let registry =
        RateRegistry::with_default_providers(&upstreams.config(), Arc::new(NoopMetrics)).unwrap();
    let cancel = CancellationToken::new();

    let batch = registry
        .fetch_rates(&cancel, &symbols(&["BTC", "eth", "USDT", "CNY"]))
        .await
        .unwrap();

    assert_eq!(batch.rates.len(), 4);
    assert_eq!(batch.rates["BTC"].price_usd, 42000.5);
    assert_eq!(batch.rates["BTC"].source, "Binance(BTC/USDC)");
    assert_eq!(batch.rates["ETH"].source, "Binance(ETH/USDC)");
    assert_eq!(batch.rates["USDT"].price_usd, 1.0);
    assert_eq!(batch.rates["USDT"].source, "Binance");
    assert!((batch.rates["CNY"].price_usd - 1.0 / 7.0).abs() < 1e-12);
    assert_eq!(batch.rates["CNY"].source, "Frankfurter");
    assert!(batch.warnings.is_empty());
    assert!(batch.rates.values().all(|r| !r.is_fallback));
}

#[tokio::test]
async fn primary_outage_fails_over_to_secondary() {
    let upstreams = Upstreams::start().await;
    upstreams.gateio_ticker("BTC_USDT", "41990").await;
    upstreams.fail_rest().await;

    let metrics = Arc::new(PrometheusMetrics::new().unwrap());
    let registry =
        RateRegistry::with_default_providers(&upstreams.config(), metrics.clone()).unwrap();

    let resolution = registry
        .fetch_rate(&CancellationToken::new(), "BTC")
        .await
        .unwrap();

    assert_eq!(resolution.rate.source, "Gate.io(BTC/USDT)");
    assert_eq!(resolution.rate.price_usd, 41990.0);
    assert_eq!(resolution.warnings, vec!["Binance unhealthy, skipped"]);
    assert_eq!(metrics.call_count("Gate.io", CallOutcome::Success), 1);
    assert_eq!(metrics.call_count("Binance", CallOutcome::Success), 0);
    assert_eq!(registry.health_status().get("Binance"), Some(&false));
}

#[tokio::test]
async fn total_outage_serves_reference_prices() {
    let upstreams = Upstreams::start().await;
    upstreams.fail_rest().await;

    let registry =
        RateRegistry::with_default_providers(&upstreams.config(), Arc::new(NoopMetrics)).unwrap();
    let cancel = CancellationToken::new();

    let btc = registry.fetch_rate(&cancel, "BTC").await.unwrap();
    assert!(btc.rate.is_fallback);
    assert_eq!(btc.rate.source, "Local");
    assert_eq!(
        btc.warnings,
        vec!["Binance unhealthy, skipped", "Gate.io unhealthy, skipped"]
    );

    let batch = registry
        .fetch_rates(&cancel, &symbols(&["CNY", "FOO"]))
        .await
        .unwrap();
    assert_eq!(batch.rates["CNY"].price_usd, 0.14);
    assert_eq!(
        batch.warnings.get("CNY").map(String::as_str),
        Some("Frankfurter unhealthy, skipped")
    );
    assert!(!batch.rates.contains_key("FOO"));
    assert_eq!(
        batch.warnings.get("FOO").map(String::as_str),
        Some("no provider supports FOO")
    );
}

#[tokio::test]
async fn every_table_symbol_resolves_during_outage() {
    let upstreams = Upstreams::start().await;
    upstreams.fail_rest().await;

    let registry =
        RateRegistry::with_default_providers(&upstreams.config(), Arc::new(NoopMetrics)).unwrap();
    let cancel = CancellationToken::new();

    for (symbol, price) in allfi_exchange_rate::provider::local::DEFAULT_PRICES {
        let resolution = registry.fetch_rate(&cancel, symbol).await.unwrap();
        assert_eq!(resolution.rate.price_usd, *price, "{}", symbol);
    }
}

#[tokio::test]
async fn refresh_health_reports_each_provider() {
    let upstreams = Upstreams::start().await;
    upstreams.binance_ticker("BTCUSDC", "42000").await;
    upstreams.fail_rest().await;

    let metrics = Arc::new(PrometheusMetrics::new().unwrap());
    let registry =
        RateRegistry::with_default_providers(&upstreams.config(), metrics.clone()).unwrap();

    registry.refresh_health(&CancellationToken::new()).await;

    let health = registry.health_status();
    assert_eq!(health.get("Binance"), Some(&true));
    assert_eq!(health.get("Gate.io"), Some(&false));
    assert_eq!(health.get("Frankfurter"), Some(&false));
    assert_eq!(health.get("Local"), Some(&true));
    assert_eq!(metrics.health_value("Gate.io"), 0.0);
    assert_eq!(metrics.health_value("Local"), 1.0);

    let names: Vec<_> = registry.providers().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Binance", "Gate.io", "Frankfurter", "Local"]);
}

#[tokio::test]
async fn cancelled_exchange_call_fails_over_to_reference_table() {
    let upstreams = Upstreams::start().await;
    upstreams.binance_ticker("BTCUSDC", "42000").await;
    Mock::given(method("GET"))
        .and(path("/api/v3/ticker/24hr"))
        .and(query_param("symbol", "ETHUSDC"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"symbol": "ETHUSDC", "lastPrice": "3600"}))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&upstreams.binance)
        .await;
    upstreams.fail_rest().await;

    let metrics = Arc::new(PrometheusMetrics::new().unwrap());
    let registry =
        RateRegistry::with_default_providers(&upstreams.config(), metrics.clone()).unwrap();
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let eth = registry.fetch_rate(&cancel, "ETH").await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(eth.rate.is_fallback);
    assert_eq!(eth.rate.price_usd, 3500.0);
    assert_eq!(
        eth.warnings,
        vec![
            "Binance failed: operation cancelled",
            "Gate.io failed: operation cancelled"
        ]
    );
    assert_eq!(
        registry.last_errors().get("Binance"),
        Some(&RateError::Cancelled)
    );
    assert_eq!(metrics.call_count("Binance", CallOutcome::Failure), 1);
    // Gate.io was never probed, so no verdict was cached for it
    assert_eq!(registry.health_status().get("Gate.io"), None);

    // The token stays cancelled; table symbols keep resolving
    let sol = registry.fetch_rate(&cancel, "SOL").await.unwrap();
    assert_eq!(sol.rate.source, "Local");
}

#[tokio::test]
async fn nothing_requested_is_an_error() {
    let upstreams = Upstreams::start().await;
    let registry =
        RateRegistry::with_default_providers(&upstreams.config(), Arc::new(NoopMetrics)).unwrap();

    let err = registry
        .fetch_rates(&CancellationToken::new(), &[])
        .await
        .unwrap_err();
    assert_eq!(err, RateError::BatchFailed);
}
