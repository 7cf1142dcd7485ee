//! Mini SWR - A stale-while-revalidate cache
//!
//! Serves cached values immediately while refreshing them in the background,
//! shares one fetch between concurrent callers of a key, and notifies
//! subscribers when a key changes.

pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{cache_key, FetchOptions, Subscription};
pub use config::Config;
pub use engine::SwrCache;
pub use error::{Result, SwrError};
pub use tasks::{spawn_trigger_listener, EnvironmentSignal, TriggerSource};
