//! Provider call metrics.
//!
//! The registry reports every provider attempt through [`RateMetrics`].
//! [`PrometheusMetrics`] keeps the series on its own
//! [`prometheus::Registry`] so several registries (or tests) never collide
//! on the process-wide default one.

use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::errors::RateError;

/// Latency buckets in seconds.
pub const LATENCY_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.0, 5.0, 10.0];

/// Outcome label of a provider call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CallOutcome {
    Success,
    Failure,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Sink for provider metrics.
pub trait RateMetrics: Send + Sync {
    /// Count one provider call.
    fn record_call(&self, provider: &str, outcome: CallOutcome);

    /// Record how long a provider call took.
    fn observe_latency(&self, provider: &str, seconds: f64);

    /// Publish the health of a provider. Only the health sweep calls this.
    fn set_health(&self, provider: &str, healthy: bool);
}

/// Recorder that drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl RateMetrics for NoopMetrics {
    fn record_call(&self, _provider: &str, _outcome: CallOutcome) {}

    fn observe_latency(&self, _provider: &str, _seconds: f64) {}

    fn set_health(&self, _provider: &str, _healthy: bool) {}
}

/// Prometheus-backed recorder.
pub struct PrometheusMetrics {
    registry: Registry,
    calls: IntCounterVec,
    response_time: HistogramVec,
    health: GaugeVec,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, RateError> {
        Self::with_registry(Registry::new())
    }

    /// Register the series on an existing registry.
    pub fn with_registry(registry: Registry) -> Result<Self, RateError> {
        let calls = IntCounterVec::new(
            Opts::new(
                "exchange_rate_provider_calls_total",
                "Total number of provider calls",
            ),
            &["provider", "status"],
        )
        .map_err(metrics_error)?;

        let response_time = HistogramVec::new(
            HistogramOpts::new(
                "exchange_rate_provider_response_seconds",
                "Provider response time in seconds",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["provider"],
        )
        .map_err(metrics_error)?;

        let health = GaugeVec::new(
            Opts::new(
                "exchange_rate_provider_health",
                "Provider health (1 = healthy, 0 = unhealthy)",
            ),
            &["provider"],
        )
        .map_err(metrics_error)?;

        registry
            .register(Box::new(calls.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(response_time.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(health.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            registry,
            calls,
            response_time,
            health,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all series in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, RateError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(metrics_error)
    }

    /// Current value of the call counter, mostly for diagnostics.
    pub fn call_count(&self, provider: &str, outcome: CallOutcome) -> u64 {
        self.calls
            .with_label_values(&[provider, outcome.as_str()])
            .get()
    }

    /// Current value of the health gauge.
    pub fn health_value(&self, provider: &str) -> f64 {
        self.health.with_label_values(&[provider]).get()
    }
}

impl RateMetrics for PrometheusMetrics {
    fn record_call(&self, provider: &str, outcome: CallOutcome) {
        self.calls
            .with_label_values(&[provider, outcome.as_str()])
            .inc();
    }

    fn observe_latency(&self, provider: &str, seconds: f64) {
        self.response_time
            .with_label_values(&[provider])
            .observe(seconds);
    }

    fn set_health(&self, provider: &str, healthy: bool) {
        self.health
            .with_label_values(&[provider])
            .set(if healthy { 1.0 } else { 0.0 });
    }
}

fn metrics_error(err: impl std::fmt::Display) -> RateError {
    RateError::Config(format!("metrics: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_calls_by_outcome() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_call("Binance", CallOutcome::Success);
        metrics.record_call("Binance", CallOutcome::Success);
        metrics.record_call("Binance", CallOutcome::Failure);

        assert_eq!(metrics.call_count("Binance", CallOutcome::Success), 2);
        assert_eq!(metrics.call_count("Binance", CallOutcome::Failure), 1);
        assert_eq!(metrics.call_count("Gate.io", CallOutcome::Success), 0);
    }

    #[test]
    fn test_health_gauge() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.set_health("Local", true);
        assert_eq!(metrics.health_value("Local"), 1.0);
        metrics.set_health("Local", false);
        assert_eq!(metrics.health_value("Local"), 0.0);
    }

    #[test]
    fn test_encode_exposition() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_call("Frankfurter", CallOutcome::Success);
        metrics.observe_latency("Frankfurter", 0.3);
        metrics.set_health("Frankfurter", true);

        let text = metrics.encode().unwrap();
        assert!(text.contains("exchange_rate_provider_calls_total"));
        assert!(text.contains("status=\"success\""));
        assert!(text.contains("exchange_rate_provider_response_seconds_bucket"));
        assert!(text.contains("le=\"0.5\""));
        assert!(text.contains("exchange_rate_provider_health{provider=\"Frankfurter\"} 1"));
    }

    #[test]
    fn test_independent_registries() {
        // Two recorders must not clash on metric names.
        assert!(PrometheusMetrics::new().is_ok());
        assert!(PrometheusMetrics::new().is_ok());
    }
}
