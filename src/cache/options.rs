//! Fetch Options Module
//!
//! Per-call knobs for the revalidation policy.

use std::time::Duration;

// == Defaults ==
/// Default window during which a repeated fetch joins the in-flight request.
pub const DEFAULT_DEDUPING_INTERVAL: Duration = Duration::from_secs(2);

/// Default age after which cached data must be refetched before it is served.
pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(5 * 60);

// == Fetch Options ==
/// Options for a single `fetch` call. Never stored with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Below this age a second call piggybacks onto the in-flight request
    pub deduping_interval: Duration,
    /// Beyond this age cached data is stale and is not served as-is
    pub cache_time: Duration,
    /// Signal observers of long-stale keys when focus is regained
    pub revalidate_on_focus: bool,
    /// Signal observers of every key when connectivity is restored
    pub revalidate_on_reconnect: bool,
}

impl FetchOptions {
    /// Returns a copy with a different deduping interval.
    pub fn with_deduping_interval(mut self, interval: Duration) -> Self {
        self.deduping_interval = interval;
        self
    }

    /// Returns a copy with a different cache time.
    pub fn with_cache_time(mut self, cache_time: Duration) -> Self {
        self.cache_time = cache_time;
        self
    }

    /// Returns a copy with the focus trigger toggled.
    pub fn with_revalidate_on_focus(mut self, enabled: bool) -> Self {
        self.revalidate_on_focus = enabled;
        self
    }

    /// Returns a copy with the reconnect trigger toggled.
    pub fn with_revalidate_on_reconnect(mut self, enabled: bool) -> Self {
        self.revalidate_on_reconnect = enabled;
        self
    }

    // == Background Refresh Threshold ==
    /// Age past which a fresh entry is refreshed in the background.
    pub fn background_refresh_after(&self) -> Duration {
        self.cache_time / 2
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            deduping_interval: DEFAULT_DEDUPING_INTERVAL,
            cache_time: DEFAULT_CACHE_TIME,
            revalidate_on_focus: true,
            revalidate_on_reconnect: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = FetchOptions::default();
        assert_eq!(options.deduping_interval, Duration::from_secs(2));
        assert_eq!(options.cache_time, Duration::from_secs(300));
        assert!(options.revalidate_on_focus);
        assert!(options.revalidate_on_reconnect);
    }

    #[test]
    fn test_builders() {
        let options = FetchOptions::default()
            .with_cache_time(Duration::from_millis(1000))
            .with_deduping_interval(Duration::from_millis(50))
            .with_revalidate_on_focus(false);

        assert_eq!(options.cache_time, Duration::from_millis(1000));
        assert_eq!(options.deduping_interval, Duration::from_millis(50));
        assert!(!options.revalidate_on_focus);
        assert!(options.revalidate_on_reconnect);
    }

    #[test]
    fn test_background_refresh_is_half_of_cache_time() {
        let options = FetchOptions::default().with_cache_time(Duration::from_millis(1000));
        assert_eq!(options.background_refresh_after(), Duration::from_millis(500));
    }
}
