//! Per-provider health cache.
//!
//! Entries are written by lazy checks during resolution and by the
//! explicit health sweep. With a TTL configured, an entry older than the
//! TTL reads as a miss so the next resolution re-probes the provider.
//! Without one, entries live until the next sweep overwrites them.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Last observed health of one provider.
#[derive(Clone, Copy, Debug)]
struct HealthEntry {
    healthy: bool,
    checked_at: Instant,
}

/// Health observations keyed by provider name.
///
/// Not synchronized on its own; the registry keeps it under its state lock.
#[derive(Debug)]
pub(crate) struct HealthCache {
    ttl: Option<Duration>,
    entries: HashMap<String, HealthEntry>,
}

impl HealthCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Cached health, or `None` when unknown or expired.
    pub fn get(&self, provider: &str) -> Option<bool> {
        let entry = self.entries.get(provider)?;
        match self.ttl {
            Some(ttl) if entry.checked_at.elapsed() >= ttl => None,
            _ => Some(entry.healthy),
        }
    }

    pub fn set(&mut self, provider: &str, healthy: bool) {
        self.entries.insert(
            provider.to_string(),
            HealthEntry {
                healthy,
                checked_at: Instant::now(),
            },
        );
    }

    /// Every recorded observation, expired or not.
    pub fn snapshot(&self) -> HashMap<String, bool> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.healthy))
            .collect()
    }
}
