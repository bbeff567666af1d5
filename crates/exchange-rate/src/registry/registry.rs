//! Provider registry and resolution chain.
//!
//! The registry owns the priority-ordered provider list, the health cache
//! and the last error seen from each provider. Resolution walks the list in
//! order:
//! - providers that do not carry the symbol are skipped silently
//! - providers cached as unhealthy are skipped with a warning
//! - the first provider that answers wins
//! - failures are recorded and the next provider is tried
//!
//! Batch resolution fans out one task per symbol, bounded by a semaphore.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::health::HealthCache;
use super::RateLimiter;
use crate::config::ExchangeRateConfig;
use crate::errors::RateError;
use crate::metrics::{CallOutcome, RateMetrics};
use crate::models::{normalize_symbol, BatchResolution, ProviderSummary, Resolution};
use crate::provider::spot::{binance, gateio};
use crate::provider::{frankfurter, FiatRateProvider, RateProvider, StaticFallbackProvider};

/// Default number of symbols resolved at once in a batch.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Default lifetime of a health observation.
pub const DEFAULT_HEALTH_TTL: Duration = Duration::from_secs(300);

/// Registry tuning.
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// Semaphore size for batch resolution.
    pub max_concurrency: usize,
    /// Health entry expiry. `None` keeps entries until the next sweep.
    pub health_ttl: Option<Duration>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            health_ttl: Some(DEFAULT_HEALTH_TTL),
        }
    }
}

struct RegisteredProvider {
    provider: Arc<dyn RateProvider>,
    /// Registration order, the tie-break for equal priorities.
    index: usize,
}

struct RegistryState {
    providers: Vec<RegisteredProvider>,
    next_index: usize,
    last_errors: HashMap<String, RateError>,
    health: HealthCache,
}

struct Shared {
    state: RwLock<RegistryState>,
    metrics: Arc<dyn RateMetrics>,
    max_concurrency: usize,
}

/// Priority-ordered chain of rate providers.
///
/// Cheap to clone; clones share providers, health and error state.
#[derive(Clone)]
pub struct RateRegistry {
    shared: Arc<Shared>,
}

impl RateRegistry {
    /// Create an empty registry.
    pub fn new(config: RegistryConfig, metrics: Arc<dyn RateMetrics>) -> Result<Self, RateError> {
        if config.max_concurrency == 0 {
            return Err(RateError::Config(
                "max_concurrency must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            shared: Arc::new(Shared {
                state: RwLock::new(RegistryState {
                    providers: Vec::new(),
                    next_index: 0,
                    last_errors: HashMap::new(),
                    health: HealthCache::new(config.health_ttl),
                }),
                metrics,
                max_concurrency: config.max_concurrency,
            }),
        })
    }

    /// Create a registry with the standard chain: primary exchange,
    /// secondary exchange, fiat rates, static fallback.
    pub fn with_default_providers(
        config: &ExchangeRateConfig,
        metrics: Arc<dyn RateMetrics>,
    ) -> Result<Self, RateError> {
        let registry = Self::new(config.registry_config(), metrics)?;

        let limiter = Arc::new(RateLimiter::new());
        limiter.configure(binance::PROVIDER_NAME, config.binance_rate_limit.clone());
        limiter.configure(gateio::PROVIDER_NAME, config.gateio_rate_limit.clone());
        limiter.configure(
            frankfurter::PROVIDER_NAME,
            config.frankfurter_rate_limit.clone(),
        );

        let proxy = config.proxy_url.as_deref();

        registry.register(Arc::new(binance::provider(
            &config.binance_url,
            config.request_timeout,
            proxy,
            config.exchange_cache_ttl,
            limiter.clone(),
        )?));
        registry.register(Arc::new(gateio::provider(
            &config.gateio_url,
            config.request_timeout,
            proxy,
            config.exchange_cache_ttl,
            limiter.clone(),
        )?));
        registry.register(Arc::new(FiatRateProvider::from_settings(
            &config.frankfurter_url,
            &config.fiat_currency,
            config.request_timeout,
            config.fiat_cache_ttl,
            limiter,
        )?));
        registry.register(Arc::new(StaticFallbackProvider::with_overrides(
            &config.fallback_prices,
        )));

        Ok(registry)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.shared.read_state()
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.shared.write_state()
    }

    /// Add a provider and re-sort the chain by (priority, registration order).
    pub fn register(&self, provider: Arc<dyn RateProvider>) {
        info!(
            "Registering rate provider '{}' (priority {})",
            provider.name(),
            provider.priority()
        );

        let mut state = self.write_state();
        let index = state.next_index;
        state.next_index += 1;
        state.providers.push(RegisteredProvider { provider, index });
        state
            .providers
            .sort_by_key(|p| (p.provider.priority(), p.index));
    }

    /// Providers in resolution order.
    pub fn providers(&self) -> Vec<ProviderSummary> {
        let state = self.read_state();
        state
            .providers
            .iter()
            .map(|p| {
                let name = p.provider.name();
                ProviderSummary {
                    name: name.to_string(),
                    priority: p.provider.priority(),
                    healthy: state.health.get(name),
                    last_error: state.last_errors.get(name).map(|e| e.to_string()),
                }
            })
            .collect()
    }

    /// Resolve one symbol through the provider chain.
    pub async fn fetch_rate(
        &self,
        cancel: &CancellationToken,
        symbol: &str,
    ) -> Result<Resolution, RateError> {
        self.shared.resolve(cancel, symbol).await
    }

    /// Resolve many symbols concurrently.
    ///
    /// At most `max_concurrency` symbols are in flight. Failed symbols are
    /// absent from `rates` and carry their error text in `warnings`.
    /// Fails only when nothing resolved.
    pub async fn fetch_rates(
        &self,
        cancel: &CancellationToken,
        symbols: &[String],
    ) -> Result<BatchResolution, RateError> {
        let semaphore = Arc::new(Semaphore::new(self.shared.max_concurrency));
        let results = Arc::new(Mutex::new(BatchResolution::default()));

        debug!(
            "Resolving {} symbols with concurrency {}",
            symbols.len(),
            self.shared.max_concurrency
        );

        let handles: Vec<_> = symbols
            .iter()
            .map(|symbol| {
                let shared = self.shared.clone();
                let semaphore = semaphore.clone();
                let results = results.clone();
                let cancel = cancel.clone();
                let symbol = normalize_symbol(symbol);

                tokio::spawn(async move {
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(RateError::Cancelled),
                        permit = semaphore.acquire_owned() => match permit {
                            Ok(_permit) => shared.resolve(&cancel, &symbol).await,
                            Err(_) => Err(RateError::Cancelled),
                        },
                    };

                    let mut batch = results.lock().unwrap_or_else(|poisoned| {
                        warn!("Batch result mutex was poisoned, recovering");
                        poisoned.into_inner()
                    });
                    match outcome {
                        Ok(resolution) => {
                            if let Some(text) = resolution.warning_text() {
                                batch.warnings.insert(symbol.clone(), text);
                            }
                            batch.rates.insert(symbol, resolution.rate);
                        }
                        Err(e) => {
                            batch.warnings.insert(symbol, e.to_string());
                        }
                    }
                })
            })
            .collect();

        for joined in futures::future::join_all(handles).await {
            if let Err(e) = joined {
                error!("Rate resolution task failed: {}", e);
            }
        }

        let batch = std::mem::take(&mut *results.lock().unwrap_or_else(|poisoned| {
            warn!("Batch result mutex was poisoned, recovering");
            poisoned.into_inner()
        }));

        if batch.rates.is_empty() {
            return Err(RateError::BatchFailed);
        }

        Ok(batch)
    }

    /// Probe every provider and overwrite the health cache.
    ///
    /// This is the only path that updates the health gauge.
    pub async fn refresh_health(&self, cancel: &CancellationToken) {
        let providers = self.shared.snapshot();

        for provider in providers {
            if cancel.is_cancelled() {
                debug!("Health refresh cancelled");
                return;
            }

            let name = provider.name().to_string();
            let healthy = provider.is_healthy(cancel).await;

            self.write_state().health.set(&name, healthy);
            self.shared.metrics.set_health(&name, healthy);

            if healthy {
                info!("Provider '{}' is healthy", name);
            } else {
                warn!("Provider '{}' is unhealthy", name);
            }
        }
    }

    /// Last observed health per provider.
    pub fn health_status(&self) -> HashMap<String, bool> {
        self.read_state().health.snapshot()
    }

    /// Last error per provider. Cleared on the provider's next success.
    pub fn last_errors(&self) -> HashMap<String, RateError> {
        self.read_state().last_errors.clone()
    }
}

impl Shared {
    fn read_state(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|poisoned| {
            warn!("Registry lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|poisoned| {
            warn!("Registry lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Current provider list. Callers iterate it without holding the lock.
    fn snapshot(&self) -> Vec<Arc<dyn RateProvider>> {
        self.read_state()
            .providers
            .iter()
            .map(|p| p.provider.clone())
            .collect()
    }

    /// Cached health, probing the provider on a miss.
    ///
    /// Once `cancel` fires, a miss is not probed and nothing is cached: the
    /// provider is attempted and reports the cancellation as its own failure.
    async fn is_healthy(&self, cancel: &CancellationToken, provider: &dyn RateProvider) -> bool {
        let cached = self.read_state().health.get(provider.name());
        if let Some(healthy) = cached {
            return healthy;
        }
        if cancel.is_cancelled() {
            return true;
        }

        let healthy = provider.is_healthy(cancel).await;
        if cancel.is_cancelled() {
            debug!("Health check for '{}' aborted", provider.name());
            return true;
        }
        self.write_state().health.set(provider.name(), healthy);
        debug!(
            "Health check for '{}' on first use: {}",
            provider.name(),
            healthy
        );
        healthy
    }

    async fn resolve(
        &self,
        cancel: &CancellationToken,
        symbol: &str,
    ) -> Result<Resolution, RateError> {
        let symbol = normalize_symbol(symbol);
        let mut warnings = Vec::new();
        let mut last_error: Option<RateError> = None;

        for provider in self.snapshot() {
            if !provider.supports_symbol(&symbol) {
                continue;
            }

            let name = provider.name();

            if !self.is_healthy(cancel, provider.as_ref()).await {
                warn!("Provider '{}' unhealthy, skipping {}", name, symbol);
                warnings.push(format!("{} unhealthy, skipped", name));
                continue;
            }

            let started = Instant::now();
            let result = provider.fetch_rate(cancel, &symbol).await;
            self.metrics
                .observe_latency(name, started.elapsed().as_secs_f64());

            match result {
                Ok(rate) => {
                    self.metrics.record_call(name, CallOutcome::Success);
                    self.write_state().last_errors.remove(name);
                    info!(
                        "Resolved {} = {} USD via '{}'",
                        symbol, rate.price_usd, rate.source
                    );
                    return Ok(Resolution { rate, warnings });
                }
                Err(e) => {
                    self.metrics.record_call(name, CallOutcome::Failure);
                    warn!("Provider '{}' failed for {}: {}", name, symbol, e);
                    warnings.push(format!("{} failed: {}", name, e));
                    self.write_state()
                        .last_errors
                        .insert(name.to_string(), e.clone());
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(source) => RateError::Exhausted {
                symbol,
                source: Box::new(source),
            },
            None => RateError::NoProvider { symbol },
        })
    }
}
