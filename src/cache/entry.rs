//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with age tracking.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use super::options::FetchOptions;

// == Cache Entry ==
/// Last known value for a key plus the metadata the revalidation policy needs.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The last successfully fetched (or explicitly set) value
    pub value: T,
    /// Monotonic time of the write that produced `value`
    pub fetched_at: Instant,
    /// Wall-clock time of the same write, for display
    pub fetched_at_utc: DateTime<Utc>,
    /// True while a refresh for this key is outstanding
    pub is_revalidating: bool,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a new, non-revalidating entry stamped with the current time.
    pub fn new(value: T) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
            fetched_at_utc: Utc::now(),
            is_revalidating: false,
        }
    }

    // == Age ==
    /// Returns how long ago this entry was written, as seen from `now`.
    pub fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.fetched_at)
    }

    /// Returns the age of this entry right now.
    pub fn age(&self) -> Duration {
        self.age_at(Instant::now())
    }

    // == Freshness ==
    /// Checks whether the entry may be served without waiting for a fetch.
    ///
    /// Boundary condition: an entry whose age equals `cache_time` is stale.
    pub fn is_fresh_at(&self, now: Instant, cache_time: Duration) -> bool {
        self.age_at(now) < cache_time
    }

    /// Checks whether serving this entry should also kick off a background
    /// refresh: it is past `options.background_refresh_after()` and no
    /// refresh is running.
    pub fn wants_background_refresh(&self, now: Instant, options: &FetchOptions) -> bool {
        !self.is_revalidating && self.age_at(now) > options.background_refresh_after()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_new_entry() {
        let entry = CacheEntry::new("value");

        assert_eq!(entry.value, "value");
        assert!(!entry.is_revalidating);
        assert_eq!(entry.age(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_age_advances_with_clock() {
        let entry = CacheEntry::new(1u32);

        tokio::time::advance(Duration::from_millis(600)).await;

        assert_eq!(entry.age(), Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_freshness_boundary() {
        let entry = CacheEntry::new(());
        let cache_time = Duration::from_millis(1000);

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(entry.is_fresh_at(Instant::now(), cache_time));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(
            !entry.is_fresh_at(Instant::now(), cache_time),
            "Entry should be stale once its age reaches cache_time"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_refresh_window() {
        let mut entry = CacheEntry::new(());
        let options = FetchOptions::default().with_cache_time(Duration::from_millis(1000));

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(!entry.wants_background_refresh(Instant::now(), &options));

        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(entry.wants_background_refresh(Instant::now(), &options));

        entry.is_revalidating = true;
        assert!(!entry.wants_background_refresh(Instant::now(), &options));
    }

    #[test]
    fn test_age_never_negative() {
        let entry = CacheEntry::new(());
        let earlier = entry.fetched_at - Duration::from_millis(10);
        assert_eq!(entry.age_at(earlier), Duration::ZERO);
    }
}
