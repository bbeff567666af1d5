use std::collections::HashMap;

use serde::Serialize;

use super::rate::RateInfo;

/// Result of resolving one symbol through the provider chain.
#[derive(Clone, Debug, Serialize)]
pub struct Resolution {
    /// The rate returned by the first provider that succeeded
    pub rate: RateInfo,

    /// Providers skipped or failed before the successful one, in attempt order
    pub warnings: Vec<String>,
}

impl Resolution {
    /// Warnings joined into one line, `None` when the chain was clean.
    pub fn warning_text(&self) -> Option<String> {
        if self.warnings.is_empty() {
            None
        } else {
            Some(self.warnings.join("; "))
        }
    }
}

/// Result of a batch resolution.
///
/// Symbols that failed everywhere are absent from `rates` and carry a
/// warning; callers compare `rates` against the requested set to detect
/// partial degradation.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchResolution {
    pub rates: HashMap<String, RateInfo>,
    pub warnings: HashMap<String, String>,
}

impl BatchResolution {
    /// Requested symbols with no rate in the result.
    pub fn missing<'a>(&self, requested: &'a [String]) -> Vec<&'a str> {
        requested
            .iter()
            .map(String::as_str)
            .filter(|s| !self.rates.contains_key(&super::normalize_symbol(s)))
            .collect()
    }
}

/// Registered provider as reported by the registry.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub name: String,
    pub priority: i32,
    /// Cached health, `None` when never checked or expired
    pub healthy: Option<bool>,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_text() {
        let mut resolution = Resolution {
            rate: RateInfo::new("BTC", 1.0, "Local"),
            warnings: vec![],
        };
        assert_eq!(resolution.warning_text(), None);

        resolution.warnings = vec![
            "Binance unhealthy, skipped".to_string(),
            "Gate.io failed: timeout".to_string(),
        ];
        assert_eq!(
            resolution.warning_text().as_deref(),
            Some("Binance unhealthy, skipped; Gate.io failed: timeout")
        );
    }

    #[test]
    fn test_missing_symbols() {
        let mut batch = BatchResolution::default();
        batch
            .rates
            .insert("BTC".to_string(), RateInfo::new("BTC", 1.0, "Local"));

        let requested = vec!["btc".to_string(), "FOO".to_string()];
        assert_eq!(batch.missing(&requested), vec!["FOO"]);
    }
}
