//! Response DTOs for the cache inspection API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheEntry, CacheStats};

/// Response body for GET /cache/:key
#[derive(Debug, Clone, Serialize)]
pub struct EntryResponse {
    /// The requested key
    pub key: String,
    /// The cached value
    pub value: Value,
    /// When the value was written, RFC 3339
    pub fetched_at: String,
    /// Age of the value in milliseconds
    pub age_ms: u64,
    /// Whether a refresh is outstanding
    pub is_validating: bool,
}

impl EntryResponse {
    /// Creates a new EntryResponse from a cache entry
    pub fn new(key: impl Into<String>, entry: CacheEntry<Value>) -> Self {
        Self {
            key: key.into(),
            age_ms: entry.age().as_millis() as u64,
            fetched_at: entry.fetched_at_utc.to_rfc3339(),
            is_validating: entry.is_revalidating,
            value: entry.value,
        }
    }
}

/// Response body for PUT /cache
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for DELETE /cache/:key
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Outcome message
    pub message: String,
    /// The key that was invalidated
    pub key: String,
    /// Whether an entry was actually removed
    pub removed: bool,
}

impl InvalidateResponse {
    /// Creates a new InvalidateResponse
    pub fn new(key: impl Into<String>, removed: bool) -> Self {
        let key = key.into();
        let message = if removed {
            format!("Key '{}' invalidated", key)
        } else {
            format!("Key '{}' was not cached", key)
        };
        Self {
            message,
            key,
            removed,
        }
    }
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    /// Number of entries removed
    pub cleared: usize,
}

impl ClearResponse {
    pub fn new(cleared: usize) -> Self {
        Self {
            message: format!("Cleared {} entries", cleared),
            cleared,
        }
    }
}

/// Response body for GET /keys
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub keys: Vec<String>,
    pub count: usize,
}

impl KeysResponse {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            count: keys.len(),
            keys,
        }
    }
}

/// Response body for POST /signals/*
#[derive(Debug, Clone, Serialize)]
pub struct SignalResponse {
    /// Which signal was raised
    pub signal: String,
    /// False when no trigger listener is installed
    pub delivered: bool,
}

impl SignalResponse {
    pub fn new(signal: impl Into<String>, delivered: bool) -> Self {
        Self {
            signal: signal.into(),
            delivered,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Fetches answered from the cache
    pub hits: u64,
    /// Fetches that waited on a new fetch
    pub misses: u64,
    /// Fetches that joined an outstanding request
    pub deduplicated: u64,
    /// Refreshes dispatched in the background
    pub background_revalidations: u64,
    /// Fetcher failures
    pub fetch_failures: u64,
    /// Key-changed signals sent
    pub notifications: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            deduplicated: stats.deduplicated,
            background_revalidations: stats.background_revalidations,
            fetch_failures: stats.fetch_failures,
            notifications: stats.notifications,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_response_serialize() {
        let entry = CacheEntry::new(json!({"qty": 2}));
        let resp = EntryResponse::new("cart:1", entry);
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["key"], "cart:1");
        assert_eq!(json["value"]["qty"], 2);
        assert_eq!(json["is_validating"], false);
        assert!(json["fetched_at"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_invalidate_response_messages() {
        assert!(InvalidateResponse::new("k", true).message.contains("invalidated"));
        assert!(InvalidateResponse::new("k", false).message.contains("not cached"));
    }

    #[test]
    fn test_keys_response_count() {
        let resp = KeysResponse::new(vec!["a".into(), "b".into()]);
        assert_eq!(resp.count, 2);
    }

    #[test]
    fn test_stats_response_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            deduplicated: 5,
            ..CacheStats::default()
        };
        let resp = StatsResponse::from(stats);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.deduplicated, 5);
    }

    #[test]
    fn test_stats_response_zero_requests() {
        let resp = StatsResponse::from(CacheStats::default());
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
