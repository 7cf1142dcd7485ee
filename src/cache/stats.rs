//! Cache Statistics Module
//!
//! Tracks how fetch requests were answered and how often observers were told.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    /// Fetches answered straight from the cache
    pub hits: u64,
    /// Fetches that had to wait for a fetch they started
    pub misses: u64,
    /// Fetches that joined an outstanding request
    pub deduplicated: u64,
    /// Refreshes dispatched without the caller waiting
    pub background_revalidations: u64,
    /// Fetcher failures
    pub fetch_failures: u64,
    /// Key-changed signals sent (one per key per mutation)
    pub notifications: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the share of fetches answered without waiting on a new fetch.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_dedup(&mut self) {
        self.deduplicated += 1;
    }

    pub fn record_background_revalidation(&mut self) {
        self.background_revalidations += 1;
    }

    pub fn record_fetch_failure(&mut self) {
        self.fetch_failures += 1;
    }

    pub fn record_notification(&mut self) {
        self.notifications += 1;
    }

    // == Update Entry Count ==
    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
