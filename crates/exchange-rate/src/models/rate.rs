use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stablecoins pegged to 1 USD.
pub const STABLECOINS: &[&str] = &["USDT", "USDC", "DAI"];

/// Normalize a user-supplied symbol: trimmed and upper-cased.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Whether the (already normalized) symbol is a USD stablecoin.
pub fn is_stablecoin(symbol: &str) -> bool {
    STABLECOINS.contains(&symbol)
}

/// USD price of one symbol as resolved by a provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateInfo {
    /// Normalized symbol (e.g. "BTC", "CNY")
    pub symbol: String,

    /// Price of one unit in USD
    pub price_usd: f64,

    /// 24h change in percent, 0 when the source does not report it
    #[serde(rename = "change24h")]
    pub change_24h: f64,

    /// 24h base volume, 0 when the source does not report it
    #[serde(rename = "volume24h")]
    pub volume_24h: f64,

    /// Market capitalization, 0 when unknown
    pub market_cap: f64,

    /// When the price was obtained
    pub last_updated: DateTime<Utc>,

    /// Provider identity, e.g. "Binance(BTC/USDC)" or "Local"
    pub source: String,

    /// True when the price comes from the hardcoded reference table
    /// rather than a live upstream.
    pub is_fallback: bool,
}

impl RateInfo {
    /// Create a live rate with only a price.
    pub fn new(symbol: impl Into<String>, price_usd: f64, source: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            price_usd,
            change_24h: 0.0,
            volume_24h: 0.0,
            market_cap: 0.0,
            last_updated: Utc::now(),
            source: source.into(),
            is_fallback: false,
        }
    }

    /// Set 24h change and volume.
    pub fn with_market(mut self, change_24h: f64, volume_24h: f64) -> Self {
        self.change_24h = change_24h;
        self.volume_24h = volume_24h;
        self
    }

    /// Mark the rate as a reference value from the fallback table.
    pub fn as_fallback(mut self) -> Self {
        self.is_fallback = true;
        self
    }
}
