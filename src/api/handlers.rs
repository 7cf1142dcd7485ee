//! API Handlers
//!
//! HTTP request handlers for each inspection endpoint.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::Config;
use crate::engine::SwrCache;
use crate::error::{Result, SwrError};
use crate::models::{
    ClearResponse, EntryResponse, HealthResponse, InvalidateResponse, KeysResponse, SetRequest,
    SetResponse, SignalResponse, StatsResponse,
};
use crate::tasks::EnvironmentSignal;

/// Application state shared across all handlers.
///
/// The cache is cheap to clone; every clone shares the same entries.
#[derive(Clone)]
pub struct AppState {
    /// Shared JSON cache
    pub cache: SwrCache<Value>,
    /// Feeds the trigger listener; `None` when no listener is installed
    pub signals: Option<mpsc::UnboundedSender<EnvironmentSignal>>,
}

impl AppState {
    /// Creates a new AppState around `cache` with no trigger listener.
    pub fn new(cache: SwrCache<Value>) -> Self {
        Self {
            cache,
            signals: None,
        }
    }

    /// Attaches the sender half of a trigger source.
    pub fn with_signals(mut self, signals: mpsc::UnboundedSender<EnvironmentSignal>) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(SwrCache::from_config(config)?))
    }

    fn raise(&self, signal: EnvironmentSignal) -> bool {
        match &self.signals {
            Some(tx) => tx.send(signal).is_ok(),
            None => false,
        }
    }
}

/// Handler for PUT /cache
///
/// Writes a value directly (optimistic update) and notifies subscribers.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    // Validate request
    if let Some(error_msg) = req.validate() {
        return Err(SwrError::InvalidRequest(error_msg));
    }

    state.cache.set(&req.key, req.value);

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /cache/:key
///
/// Returns the cached value, stale or not, with its metadata.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<EntryResponse>> {
    let entry = state
        .cache
        .entry(&key)
        .ok_or_else(|| SwrError::NotFound(key.clone()))?;

    Ok(Json(EntryResponse::new(key, entry)))
}

/// Handler for DELETE /cache/:key
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<InvalidateResponse> {
    let removed = state.cache.invalidate(&key);
    Json(InvalidateResponse::new(key, removed))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    Json(ClearResponse::new(state.cache.clear()))
}

/// Handler for GET /keys
pub async fn keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    Json(KeysResponse::new(state.cache.keys()))
}

/// Handler for GET /events/:key
///
/// Streams one `changed` event per notification for `key`. The event data
/// is the key only; clients re-read `GET /cache/:key`. The subscription is
/// removed when the client disconnects and the stream is dropped.
pub async fn events_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::unbounded_channel::<()>();
    let subscription = state.cache.subscribe(&key, move || {
        let _ = tx.send(());
    });
    debug!(key = %key, "Event stream opened");

    let events = stream::unfold((rx, subscription), |(mut rx, subscription)| async move {
        rx.recv().await?;
        let event = Event::default().event("changed").data(subscription.key());
        Some((Ok::<_, Infallible>(event), (rx, subscription)))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Handler for POST /signals/focus
pub async fn focus_handler(State(state): State<AppState>) -> Json<SignalResponse> {
    let delivered = state.raise(EnvironmentSignal::Focus);
    Json(SignalResponse::new(EnvironmentSignal::Focus.as_str(), delivered))
}

/// Handler for POST /signals/online
pub async fn online_handler(State(state): State<AppState>) -> Json<SignalResponse> {
    let delivered = state.raise(EnvironmentSignal::Online);
    Json(SignalResponse::new(EnvironmentSignal::Online.as_str(), delivered))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
