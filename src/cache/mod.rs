//! Cache Module
//!
//! Building blocks of the stale-while-revalidate cache: entry storage,
//! in-flight fetch tracking, subscriptions and statistics.

mod entry;
mod inflight;
mod key;
mod options;
mod stats;
mod store;
mod subscriptions;


// Re-export public types
pub use entry::CacheEntry;
pub use inflight::{InFlightRegistry, InFlightRequest, SharedFetch};
pub use key::{cache_key, KEY_DELIMITER};
pub use options::{FetchOptions, DEFAULT_CACHE_TIME, DEFAULT_DEDUPING_INTERVAL};
pub use stats::CacheStats;
pub use store::CacheStore;
pub use subscriptions::{deliver, Callback, Subscription, SubscriptionRegistry};
pub(crate) use subscriptions::panic_reason;

// == Public Constants ==
/// Default age past which the focus trigger signals observers of a key.
pub const DEFAULT_FOCUS_STALE_THRESHOLD: std::time::Duration =
    std::time::Duration::from_secs(10 * 60);
