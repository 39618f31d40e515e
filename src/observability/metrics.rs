//! Token acquisition counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe atomic counter.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Counters shared by a resolver and its token cache.
#[derive(Debug, Default)]
pub struct AuthMetrics {
    /// Calls into the credential source.
    pub fetches: Counter,
    pub cache_hits: Counter,
    pub refresh_failures: Counter,
    pub near_expiry_warnings: Counter,
}

impl AuthMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fetch(&self) {
        self.fetches.inc();
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.inc();
    }

    pub fn record_refresh_failure(&self) {
        self.refresh_failures.inc();
    }

    pub fn record_near_expiry_warning(&self) {
        self.near_expiry_warnings.inc();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fetches: self.fetches.get(),
            cache_hits: self.cache_hits.get(),
            refresh_failures: self.refresh_failures.get(),
            near_expiry_warnings: self.near_expiry_warnings.get(),
        }
    }
}

/// Point-in-time copy of [`AuthMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub fetches: u64,
    pub cache_hits: u64,
    pub refresh_failures: u64,
    pub near_expiry_warnings: u64,
}
