//! Configuration Module
//!
//! Handles loading and validating cache and server configuration from
//! environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::FetchOptions;
use crate::error::{Result, SwrError};

/// Cache and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deduping interval in milliseconds
    pub deduping_interval_ms: u64,
    /// Cache time in milliseconds
    pub cache_time_ms: u64,
    /// Age in milliseconds past which regaining focus signals observers
    pub focus_stale_ms: u64,
    /// Whether focus signals are acted on
    pub revalidate_on_focus: bool,
    /// Whether connectivity signals are acted on
    pub revalidate_on_reconnect: bool,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SWR_DEDUPING_INTERVAL_MS` - Deduping interval (default: 2000)
    /// - `SWR_CACHE_TIME_MS` - Cache time (default: 300000)
    /// - `SWR_FOCUS_STALE_MS` - Focus long-stale threshold (default: 600000)
    /// - `SWR_REVALIDATE_ON_FOCUS` - Act on focus signals (default: true)
    /// - `SWR_REVALIDATE_ON_RECONNECT` - Act on connectivity signals (default: true)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            deduping_interval_ms: env_or("SWR_DEDUPING_INTERVAL_MS", defaults.deduping_interval_ms),
            cache_time_ms: env_or("SWR_CACHE_TIME_MS", defaults.cache_time_ms),
            focus_stale_ms: env_or("SWR_FOCUS_STALE_MS", defaults.focus_stale_ms),
            revalidate_on_focus: env_or("SWR_REVALIDATE_ON_FOCUS", defaults.revalidate_on_focus),
            revalidate_on_reconnect: env_or(
                "SWR_REVALIDATE_ON_RECONNECT",
                defaults.revalidate_on_reconnect,
            ),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    /// Rejects settings the revalidation policy cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.cache_time_ms == 0 {
            return Err(SwrError::InvalidConfig(
                "cache time must be greater than zero".to_string(),
            ));
        }
        if self.focus_stale_ms <= self.cache_time_ms {
            return Err(SwrError::InvalidConfig(format!(
                "focus stale threshold ({}ms) must exceed cache time ({}ms)",
                self.focus_stale_ms, self.cache_time_ms
            )));
        }
        Ok(())
    }

    /// Default per-call options derived from this configuration.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            deduping_interval: Duration::from_millis(self.deduping_interval_ms),
            cache_time: Duration::from_millis(self.cache_time_ms),
            revalidate_on_focus: self.revalidate_on_focus,
            revalidate_on_reconnect: self.revalidate_on_reconnect,
        }
    }

    pub fn focus_stale_threshold(&self) -> Duration {
        Duration::from_millis(self.focus_stale_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deduping_interval_ms: 2_000,
            cache_time_ms: 300_000,
            focus_stale_ms: 600_000,
            revalidate_on_focus: true,
            revalidate_on_reconnect: true,
            server_port: 3000,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.deduping_interval_ms, 2_000);
        assert_eq!(config.cache_time_ms, 300_000);
        assert_eq!(config.focus_stale_ms, 600_000);
        assert!(config.revalidate_on_focus);
        assert!(config.revalidate_on_reconnect);
        assert_eq!(config.server_port, 3000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("SWR_DEDUPING_INTERVAL_MS");
        env::remove_var("SWR_CACHE_TIME_MS");
        env::remove_var("SWR_FOCUS_STALE_MS");
        env::remove_var("SWR_REVALIDATE_ON_FOCUS");
        env::remove_var("SWR_REVALIDATE_ON_RECONNECT");
        env::remove_var("SERVER_PORT");

        let config = Config::from_env();
        assert_eq!(config.deduping_interval_ms, 2_000);
        assert_eq!(config.cache_time_ms, 300_000);
        assert_eq!(config.focus_stale_ms, 600_000);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_fetch_options_conversion() {
        let config = Config {
            deduping_interval_ms: 50,
            cache_time_ms: 1_000,
            revalidate_on_reconnect: false,
            ..Config::default()
        };

        let options = config.fetch_options();
        assert_eq!(options.deduping_interval, Duration::from_millis(50));
        assert_eq!(options.cache_time, Duration::from_millis(1_000));
        assert!(options.revalidate_on_focus);
        assert!(!options.revalidate_on_reconnect);
        assert_eq!(config.focus_stale_threshold(), Duration::from_secs(600));
    }

    #[test]
    fn test_validate_rejects_short_focus_threshold() {
        let config = Config {
            cache_time_ms: 10_000,
            focus_stale_ms: 10_000,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(SwrError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_zero_cache_time() {
        let config = Config {
            cache_time_ms: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(SwrError::InvalidConfig(_))));
    }
}
