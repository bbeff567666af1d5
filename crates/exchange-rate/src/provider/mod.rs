//! Upstream price providers.
//!
//! Every source implements [`RateProvider`]. The registry orders them by
//! priority:
//!
//! | Provider | Priority | Covers |
//! |---|---|---|
//! | Binance | 1 | spot coins |
//! | Gate.io | 2 | spot coins |
//! | Frankfurter | 3 | one fiat currency |
//! | Local | 999 | reference table |

mod cache;
pub(crate) mod http;
mod traits;

pub mod frankfurter;
pub mod local;
pub mod spot;

pub use cache::TtlCache;
pub use frankfurter::FiatRateProvider;
pub use local::StaticFallbackProvider;
pub use spot::{SpotExchangeProvider, Ticker, TickerSource};
pub use traits::RateProvider;
