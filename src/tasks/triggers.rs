//! Environment Trigger Task
//!
//! Background task that turns focus and connectivity signals into cache
//! notifications.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::engine::SwrCache;

// == Environment Signal ==
/// A signal from the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentSignal {
    /// The application regained focus
    Focus,
    /// Network connectivity was restored
    Online,
}

impl EnvironmentSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentSignal::Focus => "focus",
            EnvironmentSignal::Online => "online",
        }
    }
}

// == Trigger Source ==
/// Where environment signals come from, decided once at startup.
#[derive(Debug)]
pub enum TriggerSource {
    /// The host has no such signals (headless, server-side)
    None,
    /// Signals arrive on a channel fed by the host
    Channel(mpsc::UnboundedReceiver<EnvironmentSignal>),
}

impl TriggerSource {
    /// Creates a channel-backed source and the sender the host feeds.
    pub fn channel() -> (mpsc::UnboundedSender<EnvironmentSignal>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, TriggerSource::Channel(rx))
    }
}

/// Spawns a task that applies environment signals to `cache`.
///
/// Focus signals notify observers of long-stale keys, connectivity signals
/// notify observers of every key; neither fetches. With
/// [`TriggerSource::None`] nothing is installed and `None` is returned.
/// The task ends when every sender is dropped, or when aborted through the
/// returned handle during shutdown.
///
/// # Example
/// ```ignore
/// let (signals, source) = TriggerSource::channel();
/// let handle = spawn_trigger_listener(cache.clone(), source);
/// signals.send(EnvironmentSignal::Online)?;
/// ```
pub fn spawn_trigger_listener<T>(cache: SwrCache<T>, source: TriggerSource) -> Option<JoinHandle<()>>
where
    T: Clone + Send + Sync + 'static,
{
    let mut signals = match source {
        TriggerSource::None => {
            debug!("No environment trigger source, listener not installed");
            return None;
        }
        TriggerSource::Channel(rx) => rx,
    };

    Some(tokio::spawn(async move {
        info!("Starting environment trigger listener");

        while let Some(signal) = signals.recv().await {
            let signalled = match signal {
                EnvironmentSignal::Focus => cache.on_focus(),
                EnvironmentSignal::Online => cache.on_reconnect(),
            };

            if signalled.is_empty() {
                debug!(signal = signal.as_str(), "No keys signalled");
            } else {
                info!(
                    signal = signal.as_str(),
                    keys = signalled.len(),
                    "Environment signal delivered"
                );
            }
        }

        info!("Environment trigger listener stopped");
    }))
}
