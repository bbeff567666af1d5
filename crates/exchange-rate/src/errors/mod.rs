//! Error types for the exchange-rate engine.
//!
//! Provider-level variants carry the name of the provider that produced them.
//! They are recovered inside the registry and turned into warnings; only
//! [`RateError::Exhausted`], [`RateError::NoProvider`] and
//! [`RateError::BatchFailed`] reach callers of the registry.

use thiserror::Error;

/// Errors that can occur while resolving exchange rates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RateError {
    /// An upstream request failed or returned data we could not use.
    #[error("{provider}: {message}")]
    Provider {
        /// The provider that failed
        provider: String,
        /// What went wrong
        message: String,
    },

    /// The provider does not carry this symbol.
    #[error("{provider}: unsupported symbol {symbol}")]
    UnsupportedSymbol {
        /// The provider that rejected the symbol
        provider: String,
        /// The normalized symbol
        symbol: String,
    },

    /// The upstream request timed out.
    #[error("{provider}: request timed out")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The upstream answered with HTTP 429 or an equivalent.
    #[error("{provider}: rate limited")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// No registered provider was eligible for the symbol.
    #[error("no provider supports {symbol}")]
    NoProvider {
        /// The normalized symbol
        symbol: String,
    },

    /// Every eligible provider was tried and failed.
    #[error("all providers failed to resolve {symbol}: {source}")]
    Exhausted {
        /// The normalized symbol
        symbol: String,
        /// The last provider error observed
        #[source]
        source: Box<RateError>,
    },

    /// A batch request produced no rates at all.
    #[error("all symbols failed to resolve")]
    BatchFailed,

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RateError {
    /// Build a [`RateError::Provider`] from anything printable.
    pub fn provider(provider: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// Name of the provider behind a provider-level error.
    pub fn provider_name(&self) -> Option<&str> {
        match self {
            Self::Provider { provider, .. }
            | Self::UnsupportedSymbol { provider, .. }
            | Self::Timeout { provider }
            | Self::RateLimited { provider } => Some(provider),
            Self::Exhausted { source, .. } => source.provider_name(),
            Self::Cancelled | Self::NoProvider { .. } | Self::BatchFailed | Self::Config(_) => None,
        }
    }

    /// Map a transport error from `reqwest` onto the matching variant.
    pub(crate) fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                provider: provider.to_string(),
            }
        } else {
            Self::provider(provider, format!("Request failed: {}", err))
        }
    }
}
