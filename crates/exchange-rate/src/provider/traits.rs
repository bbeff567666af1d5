//! Rate provider trait definitions.
//!
//! This module defines the core `RateProvider` trait that all upstream
//! price sources implement.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::RateError;
use crate::models::RateInfo;

/// Trait for exchange-rate providers.
///
/// Implement this trait to add a new upstream price source. The registry
/// orders providers by [`priority`](Self::priority) and falls through to the
/// next one when a provider is unhealthy, does not carry a symbol, or fails.
///
/// Implementations must be safe to call concurrently: during a batch fetch
/// the registry calls the same provider for different symbols at once.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use allfi_exchange_rate::provider::RateProvider;
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl RateProvider for MyProvider {
///     fn name(&self) -> &str {
///         "MyProvider"
///     }
///
///     fn priority(&self) -> i32 {
///         5
///     }
///
///     // ... implement fetch methods
/// }
/// ```
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Provider identity used for logs, metrics, warnings and health tracking.
    fn name(&self) -> &str;

    /// Provider priority for ordering.
    ///
    /// Lower values are tried first.
    fn priority(&self) -> i32;

    /// Fetch the USD rate of a single symbol.
    ///
    /// The symbol may arrive in any case; implementations normalize it.
    async fn fetch_rate(
        &self,
        cancel: &CancellationToken,
        symbol: &str,
    ) -> Result<RateInfo, RateError>;

    /// Fetch every supported symbol.
    ///
    /// Symbols are attempted independently. Partial success is returned as
    /// `Ok`; an error is returned only when every symbol failed.
    async fn fetch_rates(
        &self,
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, RateInfo>, RateError> {
        let mut rates = HashMap::new();
        for symbol in self.supported_symbols() {
            match self.fetch_rate(cancel, &symbol).await {
                Ok(rate) => {
                    rates.insert(symbol, rate);
                }
                Err(e) => {
                    log::warn!("{} failed to fetch {}: {}", self.name(), symbol, e);
                }
            }
        }

        if rates.is_empty() {
            return Err(RateError::provider(
                self.name(),
                "all supported symbols failed",
            ));
        }

        Ok(rates)
    }

    /// Cheap liveness probe.
    async fn is_healthy(&self, cancel: &CancellationToken) -> bool;

    /// Symbols this provider can price.
    fn supported_symbols(&self) -> Vec<String>;

    /// Whether this provider can price the symbol (case-insensitive).
    fn supports_symbol(&self, symbol: &str) -> bool;
}
