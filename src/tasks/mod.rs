//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of the cache.
//!
//! # Tasks
//! - Environment triggers: turn focus/connectivity signals into notifications

mod triggers;

pub use triggers::{spawn_trigger_listener, EnvironmentSignal, TriggerSource};
