//! Cache Store Module
//!
//! Per-key storage of the last known value and its revalidation state.
//! The store never notifies by itself; the engine fires notifications once
//! a mutation is complete and its locks are released.

use std::collections::HashMap;

use tokio::time::Instant;

use crate::cache::CacheEntry;

// == Cache Store ==
/// Holds one `CacheEntry` per key. Entries never expire on their own;
/// staleness is judged lazily by the engine at access time.
#[derive(Debug)]
pub struct CacheStore<T> {
    /// Key-entry storage
    entries: HashMap<String, CacheEntry<T>>,
}

impl<T> Default for CacheStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CacheStore<T> {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    // == Get ==
    /// Returns the entry for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&CacheEntry<T>> {
        self.entries.get(key)
    }

    // == Set ==
    /// Writes `value` under `key` with a fresh timestamp and the
    /// revalidating flag cleared.
    ///
    /// `fetched_at` never moves backwards for a key, so value and timestamp
    /// are always replaced together.
    pub fn set(&mut self, key: &str, value: T) {
        let mut entry = CacheEntry::new(value);
        if let Some(previous) = self.entries.get(key) {
            if previous.fetched_at > entry.fetched_at {
                entry.fetched_at = previous.fetched_at;
            }
        }
        self.entries.insert(key.to_string(), entry);
    }

    // == Delete ==
    /// Removes the entry for `key`. Returns true if one existed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    // == Clear ==
    /// Removes every entry and returns the keys that were cached.
    pub fn clear(&mut self) -> Vec<String> {
        self.entries.drain().map(|(key, _)| key).collect()
    }

    // == Revalidation Flag ==
    /// Marks an existing entry as revalidating. No-op for absent keys.
    pub fn mark_revalidating(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.is_revalidating = true;
        }
    }

    /// Clears the revalidating flag, keeping the stale value in place.
    pub fn clear_revalidating(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.is_revalidating = false;
        }
    }

    // == Long-Stale Keys ==
    /// Returns keys whose entries are older than `threshold` and are not
    /// being refreshed.
    pub fn stale_keys(&self, now: Instant, threshold: std::time::Duration) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_revalidating && entry.age_at(now) > threshold)
            .map(|(key, _)| key.clone())
            .collect()
    }

    // == Keys ==
    /// Returns every cached key, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    // == Length ==
    /// Returns the current number of entries in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
