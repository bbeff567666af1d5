//! Exchange-rate models
//!
//! - `rate` - The resolved price of one symbol (RateInfo) and symbol helpers
//! - `resolution` - Registry results carrying warnings (Resolution, BatchResolution)

mod rate;
mod resolution;

pub use rate::{is_stablecoin, normalize_symbol, RateInfo, STABLECOINS};
pub use resolution::{BatchResolution, ProviderSummary, Resolution};
