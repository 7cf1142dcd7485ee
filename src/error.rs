//! Error types for the SWR cache
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == SWR Error Enum ==
/// Unified error type for the cache engine and its HTTP surface.
///
/// Cloneable so that every caller joined onto one in-flight fetch receives
/// the same failure.
#[derive(Error, Debug, Clone)]
pub enum SwrError {
    /// The fetcher for a key failed. Any stale value stays in the cache.
    #[error("Fetch failed for key '{key}': {cause:#}")]
    Fetch {
        key: String,
        cause: Arc<anyhow::Error>,
    },

    /// Rejected cache configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Key not present in the cache (HTTP surface only)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data (HTTP surface only)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl SwrError {
    /// Wraps a fetcher failure for `key`.
    pub fn fetch(key: impl Into<String>, cause: anyhow::Error) -> Self {
        SwrError::Fetch {
            key: key.into(),
            cause: Arc::new(cause),
        }
    }

    /// Returns true if this error came from a fetcher.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, SwrError::Fetch { .. })
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for SwrError {
    fn into_response(self) -> Response {
        let status = match &self {
            SwrError::Fetch { .. } => StatusCode::BAD_GATEWAY,
            SwrError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SwrError::NotFound(_) => StatusCode::NOT_FOUND,
            SwrError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, SwrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display_includes_cause_chain() {
        let cause = anyhow::anyhow!("connection reset").context("loading product");
        let err = SwrError::fetch("product:42", cause);

        let message = err.to_string();
        assert!(message.contains("product:42"));
        assert!(message.contains("loading product"));
        assert!(message.contains("connection reset"));
        assert!(err.is_fetch_failure());
    }

    #[test]
    fn test_clone_shares_cause() {
        let err = SwrError::fetch("k", anyhow::anyhow!("boom"));
        let cloned = err.clone();
        match (err, cloned) {
            (SwrError::Fetch { cause: a, .. }, SwrError::Fetch { cause: b, .. }) => {
                assert!(Arc::ptr_eq(&a, &b));
            }
            _ => panic!("expected fetch errors"),
        }
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (SwrError::NotFound("k".into()), StatusCode::NOT_FOUND),
            (SwrError::InvalidRequest("bad".into()), StatusCode::BAD_REQUEST),
            (
                SwrError::fetch("k", anyhow::anyhow!("down")),
                StatusCode::BAD_GATEWAY,
            ),
            (
                SwrError::InvalidConfig("bad".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
