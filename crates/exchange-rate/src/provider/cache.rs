//! Short-lived response cache private to a provider.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::warn;

use crate::models::RateInfo;

/// Time-bounded cache of rates keyed by an upstream-specific key
/// (a trading pair, a currency code).
///
/// Entries past their TTL are treated as absent and dropped on the next
/// lookup. A zero TTL disables caching.
pub struct TtlCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (RateInfo, Instant)>>,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Lock the entries, recovering from poison. A cache can always be
    /// rebuilt from upstream.
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, (RateInfo, Instant)>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Rate cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Cached rate for `key` if still fresh.
    pub fn get(&self, key: &str) -> Option<RateInfo> {
        if self.ttl.is_zero() {
            return None;
        }

        let mut entries = self.lock_entries();
        match entries.get(key) {
            Some((rate, stored_at)) if stored_at.elapsed() < self.ttl => Some(rate.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: impl Into<String>, rate: RateInfo) {
        if self.ttl.is_zero() {
            return;
        }
        self.lock_entries()
            .insert(key.into(), (rate, Instant::now()));
    }
}
