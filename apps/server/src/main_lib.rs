use std::sync::Arc;

use allfi_exchange_rate::{NoopMetrics, PrometheusMetrics, RateMetrics, RateRegistry};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

pub struct AppState {
    pub registry: RateRegistry,
    /// `None` when metrics are disabled.
    pub metrics: Option<Arc<PrometheusMetrics>>,
    pub default_symbols: Vec<String>,
    /// Cancelled on shutdown; request tokens are children of it.
    pub shutdown: CancellationToken,
}

pub fn init_tracing() {
    let log_format = std::env::var("ER_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_state(config: &Config, shutdown: CancellationToken) -> anyhow::Result<Arc<AppState>> {
    let metrics = if config.rates.metrics_enabled {
        Some(Arc::new(PrometheusMetrics::new()?))
    } else {
        tracing::info!("Provider metrics disabled");
        None
    };

    let sink: Arc<dyn RateMetrics> = match &metrics {
        Some(m) => m.clone(),
        None => Arc::new(NoopMetrics),
    };

    let registry = RateRegistry::with_default_providers(&config.rates, sink)?;
    for provider in registry.providers() {
        tracing::info!(
            "Provider chain: {} (priority {})",
            provider.name,
            provider.priority
        );
    }

    Ok(Arc::new(AppState {
        registry,
        metrics,
        default_symbols: config.default_symbols.clone(),
        shutdown,
    }))
}
