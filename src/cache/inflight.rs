//! In-Flight Registry Module
//!
//! Tracks at most one outstanding fetch per key so concurrent callers can
//! share it.

use std::collections::HashMap;

use futures::future::{BoxFuture, Shared};

use crate::error::SwrError;

/// A fetch every joiner awaits together. Settlement bookkeeping runs inside
/// the future, so a joiner only sees the result once the cache is updated.
pub type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, SwrError>>>;

// == In-Flight Request ==
/// One outstanding fetch for a key.
pub struct InFlightRequest<T> {
    /// Identifies this registration; a settling fetch only touches the cache
    /// if its token is still the registered one
    pub token: u64,
    future: SharedFetch<T>,
}

impl<T> std::fmt::Debug for InFlightRequest<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlightRequest")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

// == In-Flight Registry ==
#[derive(Debug)]
pub struct InFlightRegistry<T> {
    requests: HashMap<String, InFlightRequest<T>>,
    next_token: u64,
}

impl<T> Default for InFlightRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> InFlightRegistry<T> {
    pub fn new() -> Self {
        Self {
            requests: HashMap::new(),
            next_token: 0,
        }
    }

    /// Hands out a token for a fetch about to be registered.
    pub fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    /// Registers `future` as the fetch for `key`.
    ///
    /// The engine only registers when nothing is outstanding for the key;
    /// a debug build asserts it.
    pub fn register(&mut self, key: &str, token: u64, future: SharedFetch<T>) {
        let previous = self.requests.insert(
            key.to_string(),
            InFlightRequest { token, future },
        );
        debug_assert!(previous.is_none(), "second in-flight fetch for {key}");
    }

    /// Returns the outstanding fetch for `key`, if any.
    pub fn get(&self, key: &str) -> Option<SharedFetch<T>> {
        self.requests.get(key).map(|request| request.future.clone())
    }

    /// Returns true if a fetch is outstanding for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.requests.contains_key(key)
    }

    /// Removes the registration for `key` if it still belongs to `token`.
    ///
    /// Returns false when the registration was already dropped by an
    /// invalidation or reset.
    pub fn release(&mut self, key: &str, token: u64) -> bool {
        match self.requests.get(key) {
            Some(request) if request.token == token => {
                self.requests.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Drops the registration for `key` regardless of owner.
    pub fn forget(&mut self, key: &str) -> bool {
        self.requests.remove(key).is_some()
    }

    /// Drops every registration.
    pub fn clear(&mut self) {
        self.requests.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn ready(value: u32) -> SharedFetch<u32> {
        async move { Ok(value) }.boxed().shared()
    }

    #[tokio::test]
    async fn test_register_and_join() {
        let mut registry = InFlightRegistry::new();
        let token = registry.next_token();
        registry.register("k", token, ready(7));

        assert!(registry.contains("k"));
        let joined = registry.get("k").unwrap();
        assert_eq!(joined.await.unwrap(), 7);
    }

    #[test]
    fn test_tokens_are_unique() {
        let mut registry: InFlightRegistry<u32> = InFlightRegistry::new();
        let a = registry.next_token();
        let b = registry.next_token();
        assert_ne!(a, b);
    }

    #[test]
    fn test_release_requires_matching_token() {
        let mut registry = InFlightRegistry::new();
        let stale = registry.next_token();
        let current = registry.next_token();
        registry.register("k", current, ready(1));

        assert!(!registry.release("k", stale));
        assert!(registry.contains("k"));

        assert!(registry.release("k", current));
        assert!(!registry.contains("k"));
    }

    #[test]
    fn test_forget_and_clear() {
        let mut registry = InFlightRegistry::new();
        let t1 = registry.next_token();
        registry.register("a", t1, ready(1));
        let t2 = registry.next_token();
        registry.register("b", t2, ready(2));

        assert!(registry.forget("a"));
        assert!(!registry.forget("a"));
        assert!(registry.contains("b"));

        registry.clear();
        assert!(!registry.contains("b"));
        assert!(!registry.release("b", t2));
    }
}
