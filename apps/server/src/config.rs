use std::{net::SocketAddr, time::Duration};

use allfi_exchange_rate::ExchangeRateConfig;
use anyhow::Context;

/// Symbols priced when a batch request names none.
pub const DEFAULT_SYMBOLS: &[&str] = &["BTC", "ETH", "USDT", "USDC", "BNB", "SOL"];

pub struct Config {
    pub listen_addr: SocketAddr,
    pub cors_allow: Vec<String>,
    /// Interval of the background health sweep.
    pub health_refresh_interval: Duration,
    pub default_symbols: Vec<String>,
    pub rates: ExchangeRateConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = std::env::var("ER_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("Invalid ER_LISTEN_ADDR")?;
        let cors_allow = std::env::var("ER_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let refresh_secs: u64 = std::env::var("ER_HEALTH_REFRESH_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .unwrap_or(300);
        let default_symbols = std::env::var("ER_DEFAULT_SYMBOLS")
            .ok()
            .map(|v| split_symbols(&v))
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect());
        let rates = ExchangeRateConfig::from_env()?;

        Ok(Self {
            listen_addr,
            cors_allow,
            health_refresh_interval: Duration::from_secs(refresh_secs.max(1)),
            default_symbols,
            rates,
        })
    }
}

/// Split a comma-separated symbol list, dropping blanks.
pub fn split_symbols(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
