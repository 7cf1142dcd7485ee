//! Subscription Registry Module
//!
//! Maps keys to payload-free change callbacks and delivers notifications.
//!
//! Delivery is synchronous and happens on the mutating caller, after every
//! cache lock is released, so a callback may read the cache. A callback must
//! not synchronously mutate the key it was notified for: that notifies it
//! again, recursively.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

use tracing::{error, trace};

/// A change callback. Carries no payload; re-query the cache for state.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

// == Subscription Registry ==
#[derive(Default)]
pub struct SubscriptionRegistry {
    /// Callbacks per key, in registration order
    subscribers: HashMap<String, Vec<(u64, Callback)>>,
    next_id: u64,
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("keys", &self.subscribers.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `key` and returns its id.
    pub fn subscribe(&mut self, key: &str, callback: Callback) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.subscribers
            .entry(key.to_string())
            .or_default()
            .push((id, callback));
        id
    }

    /// Removes exactly the callback registered under `id`. Drops the key's
    /// set when it was the last one.
    pub fn unsubscribe(&mut self, key: &str, id: u64) -> bool {
        let Some(callbacks) = self.subscribers.get_mut(key) else {
            return false;
        };
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        let removed = callbacks.len() != before;
        if callbacks.is_empty() {
            self.subscribers.remove(key);
        }
        removed
    }

    /// Snapshot of the callbacks for `key`, in registration order.
    pub fn callbacks(&self, key: &str) -> Vec<Callback> {
        self.subscribers
            .get(key)
            .map(|callbacks| callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default()
    }

    /// Keys with at least one subscriber.
    pub fn subscribed_keys(&self) -> Vec<String> {
        self.subscribers.keys().cloned().collect()
    }

    /// Number of callbacks registered for `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.subscribers.get(key).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// Best-effort text of a caught panic.
pub(crate) fn panic_reason(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

// == Notifier ==
/// Invokes `callbacks` in order. A panicking callback is logged and does
/// not stop delivery to the rest. Returns how many completed normally.
pub fn deliver(key: &str, callbacks: &[Callback]) -> usize {
    let mut delivered = 0;
    for callback in callbacks {
        match panic::catch_unwind(AssertUnwindSafe(|| callback())) {
            Ok(()) => delivered += 1,
            Err(payload) => {
                let reason = panic_reason(payload.as_ref());
                error!(key, reason = %reason, "Subscriber panicked during notification");
            }
        }
    }
    trace!(key, delivered, total = callbacks.len(), "Notification delivered");
    delivered
}

// == Subscription Handle ==
/// Handle returned by `subscribe`. Dropping it, or calling
/// [`Subscription::unsubscribe`], removes the callback.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    registry: Weak<Mutex<SubscriptionRegistry>>,
    key: String,
    id: u64,
}

impl Subscription {
    pub(crate) fn new(registry: &Arc<Mutex<SubscriptionRegistry>>, key: &str, id: u64) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            key: key.to_string(),
            id,
        }
    }

    /// The key this subscription listens to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Removes the callback now.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }

    fn remove(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = match registry.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        registry.unsubscribe(&self.key, self.id);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}
