//! Per-provider request throttling.
//!
//! Every network-backed provider calls [`RateLimiter::wait`] before it
//! touches its upstream. Limits are set per provider name with
//! [`RateLimiter::configure`]; unconfigured names share the default limit
//! but each still gets its own bucket.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::errors::RateError;

/// Shortest sleep between two attempts on a drained bucket.
const MIN_WAIT: Duration = Duration::from_millis(10);

/// Rate limit for one provider.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Sustained requests per minute.
    pub requests_per_minute: u32,
    /// Requests allowed back to back before throttling starts.
    pub burst_capacity: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 300,
            burst_capacity: 10.0,
        }
    }
}

/// Request allowance of one provider.
#[derive(Debug)]
struct Allowance {
    available: f64,
    burst: f64,
    per_second: f64,
    refilled_at: Instant,
}

impl Allowance {
    fn from_config(config: &RateLimitConfig) -> Self {
        let burst = config.burst_capacity.max(1.0);
        Self {
            available: burst,
            burst,
            per_second: f64::from(config.requests_per_minute) / 60.0,
            refilled_at: Instant::now(),
        }
    }

    /// Spend one request, or report how long until one is available.
    fn take(&mut self, now: Instant) -> Result<(), Duration> {
        let elapsed = now.saturating_duration_since(self.refilled_at).as_secs_f64();
        self.available = (self.available + elapsed * self.per_second).min(self.burst);
        self.refilled_at = now;

        if self.available >= 1.0 {
            self.available -= 1.0;
            return Ok(());
        }

        let missing = 1.0 - self.available;
        let until = if self.per_second > 0.0 {
            Duration::from_secs_f64(missing / self.per_second)
        } else {
            Duration::from_secs(1)
        };
        Err(until.max(MIN_WAIT))
    }
}

#[derive(Default)]
struct LimiterState {
    configs: HashMap<String, RateLimitConfig>,
    allowances: HashMap<String, Allowance>,
}

/// Throttle shared by the providers of one registry.
#[derive(Default)]
pub struct RateLimiter {
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Set the limit for `provider`, starting it with a full burst.
    pub fn configure(&self, provider: &str, config: RateLimitConfig) {
        let mut state = self.lock();
        state
            .allowances
            .insert(provider.to_string(), Allowance::from_config(&config));
        state.configs.insert(provider.to_string(), config);
    }

    /// Wait until `provider` may issue a request.
    ///
    /// Fails with [`RateError::Cancelled`] as soon as `cancel` fires,
    /// including when it was already cancelled on entry.
    pub async fn wait(&self, cancel: &CancellationToken, provider: &str) -> Result<(), RateError> {
        loop {
            if cancel.is_cancelled() {
                return Err(RateError::Cancelled);
            }

            let pause = {
                let mut state = self.lock();
                let LimiterState {
                    configs,
                    allowances,
                } = &mut *state;
                let allowance = allowances.entry(provider.to_string()).or_insert_with(|| {
                    Allowance::from_config(&configs.get(provider).cloned().unwrap_or_default())
                });
                match allowance.take(Instant::now()) {
                    Ok(()) => return Ok(()),
                    Err(pause) => pause,
                }
            };

            debug!("'{}' throttled for {:?}", provider, pause);

            tokio::select! {
                _ = cancel.cancelled() => return Err(RateError::Cancelled),
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(requests_per_minute: u32, burst_capacity: f64) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_minute,
            burst_capacity,
        }
    }

    #[test]
    fn test_allowance_reports_time_to_next_request() {
        let start = Instant::now();
        let mut allowance = Allowance::from_config(&limit(60, 1.0));

        assert!(allowance.take(start).is_ok());
        let pause = allowance.take(start).unwrap_err();
        assert!(pause > Duration::from_millis(900) && pause <= Duration::from_secs(1));

        assert!(allowance.take(start + Duration::from_secs(2)).is_ok());
    }

    #[tokio::test]
    async fn test_wait_throttles_after_burst() {
        let limiter = RateLimiter::new();
        limiter.configure("Binance", limit(6_000, 2.0));
        let cancel = CancellationToken::new();

        limiter.wait(&cancel, "Binance").await.unwrap();
        limiter.wait(&cancel, "Binance").await.unwrap();

        let start = Instant::now();
        limiter.wait(&cancel, "Binance").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_configured_providers_are_isolated() {
        let limiter = RateLimiter::new();
        limiter.configure("Frankfurter", limit(1, 1.0));
        limiter.configure("Gate.io", limit(1, 3.0));
        let cancel = CancellationToken::new();

        limiter.wait(&cancel, "Frankfurter").await.unwrap();

        // A drained provider does not hold back another one
        let start = Instant::now();
        for _ in 0..3 {
            limiter.wait(&cancel, "Gate.io").await.unwrap();
        }
        limiter.wait(&cancel, "Unconfigured").await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));

        let drained = tokio::time::timeout(
            Duration::from_millis(50),
            limiter.wait(&cancel, "Frankfurter"),
        )
        .await;
        assert!(drained.is_err());
    }

    #[tokio::test]
    async fn test_reconfigure_refills_burst() {
        let limiter = RateLimiter::new();
        limiter.configure("Binance", limit(1, 1.0));
        let cancel = CancellationToken::new();
        limiter.wait(&cancel, "Binance").await.unwrap();

        limiter.configure("Binance", limit(1, 1.0));
        let refilled =
            tokio::time::timeout(Duration::from_millis(50), limiter.wait(&cancel, "Binance")).await;
        assert!(matches!(refilled, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_wait_fails_when_already_cancelled() {
        let limiter = RateLimiter::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(limiter.wait(&cancel, "Binance").await, Err(RateError::Cancelled));
    }

    #[tokio::test]
    async fn test_wait_observes_cancellation_while_throttled() {
        let limiter = RateLimiter::new();
        limiter.configure("Gate.io", limit(1, 1.0));
        let cancel = CancellationToken::new();
        limiter.wait(&cancel, "Gate.io").await.unwrap();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        assert_eq!(limiter.wait(&cancel, "Gate.io").await, Err(RateError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
