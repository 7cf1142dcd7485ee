//! Revalidation Engine
//!
//! `SwrCache` ties the cache store, in-flight registry and subscriptions
//! together and decides, per fetch, whether to serve cached data, refresh it
//! in the background, or make the caller wait for a fetch.
//!
//! Bookkeeping happens under `std::sync::Mutex` guards that are never held
//! across an `.await` or while user callbacks run, so every store/registry
//! step is atomic with respect to other cache operations. Suspension only
//! happens while a fetcher's future is awaited.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use anyhow::anyhow;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{
    deliver, panic_reason, CacheEntry, CacheStats, CacheStore, FetchOptions, InFlightRegistry,
    SharedFetch, Subscription, SubscriptionRegistry, DEFAULT_FOCUS_STALE_THRESHOLD,
};
use crate::config::Config;
use crate::error::{Result, SwrError};

struct State<T> {
    store: CacheStore<T>,
    inflight: InFlightRegistry<T>,
    stats: CacheStats,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    subscriptions: Arc<Mutex<SubscriptionRegistry>>,
    defaults: FetchOptions,
    focus_stale_threshold: Duration,
}

enum Action<T> {
    Return(T),
    Wait(SharedFetch<T>),
}

/// Hands a registered fetch the request its fetcher produced. The fetcher
/// is only called once the state lock is released.
type Launch<T> = oneshot::Sender<BoxFuture<'static, anyhow::Result<T>>>;

fn lock<U>(mutex: &Mutex<U>) -> MutexGuard<'_, U> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// == SWR Cache ==
/// A stale-while-revalidate cache for values of type `T`.
///
/// Cloning is cheap and every clone shares the same entries, in-flight
/// fetches and subscribers. Construct one per process or session and hand
/// clones to whoever needs it.
///
/// # Example
/// ```ignore
/// let cache: SwrCache<Product> = SwrCache::default();
/// let key = cache_key(["product", "42"]);
/// let product = cache.fetch(&key, || api.load_product(42)).await?;
/// ```
pub struct SwrCache<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SwrCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for SwrCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(FetchOptions::default())
    }
}

impl<T> SwrCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates a cache with the given default options.
    ///
    /// The focus threshold is the larger of the default threshold and twice
    /// the cache time, saturating at `Duration::MAX`.
    ///
    /// Unlike [`SwrCache::with_focus_threshold`] a zero cache time is
    /// accepted here: nothing is ever fresh, so every fetch past the
    /// deduping window waits for its fetcher.
    pub fn new(defaults: FetchOptions) -> Self {
        let threshold = DEFAULT_FOCUS_STALE_THRESHOLD.max(defaults.cache_time.saturating_mul(2));
        Self::build(defaults, threshold)
    }

    /// Creates a cache with an explicit focus long-stale threshold.
    pub fn with_focus_threshold(defaults: FetchOptions, threshold: Duration) -> Result<Self> {
        if defaults.cache_time.is_zero() {
            return Err(SwrError::InvalidConfig(
                "cache time must be greater than zero".to_string(),
            ));
        }
        if threshold <= defaults.cache_time {
            return Err(SwrError::InvalidConfig(format!(
                "focus stale threshold ({threshold:?}) must exceed cache time ({:?})",
                defaults.cache_time
            )));
        }
        Ok(Self::build(defaults, threshold))
    }

    /// Creates a cache from loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(
            config.fetch_options(),
            config.focus_stale_threshold(),
        ))
    }

    fn build(defaults: FetchOptions, focus_stale_threshold: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    store: CacheStore::new(),
                    inflight: InFlightRegistry::new(),
                    stats: CacheStats::new(),
                }),
                subscriptions: Arc::new(Mutex::new(SubscriptionRegistry::new())),
                defaults,
                focus_stale_threshold,
            }),
        }
    }

    /// Options used by [`SwrCache::fetch`].
    pub fn defaults(&self) -> FetchOptions {
        self.inner.defaults
    }

    pub fn focus_stale_threshold(&self) -> Duration {
        self.inner.focus_stale_threshold
    }

    fn lock_state(&self) -> MutexGuard<'_, State<T>> {
        lock(&self.inner.state)
    }

    // == Fetch ==
    /// Fetches `key` with the cache's default options.
    pub async fn fetch<F, Fut>(&self, key: &str, fetcher: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.fetch_with(key, fetcher, self.inner.defaults).await
    }

    /// Fetches `key`, serving cached data where the policy allows.
    ///
    /// 1. An outstanding fetch for a key cached less than
    ///    `deduping_interval` ago is joined instead of starting another.
    /// 2. A key cached less than `cache_time` ago is returned immediately;
    ///    past half its cache time a background refresh is dispatched too.
    /// 3. Otherwise the caller waits for a fetch. If one is already
    ///    outstanding it is joined, so a key never has two.
    ///
    /// `fetcher` is invoked at most once, synchronously and with no cache
    /// lock held, when this call dispatches a revalidation, so it may read
    /// the cache. Its error, or its panic, is returned to every caller
    /// waiting on that fetch; a stale value stays cached.
    pub async fn fetch_with<F, Fut>(&self, key: &str, fetcher: F, options: FetchOptions) -> Result<T>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let (action, launch) = {
            let mut state = self.lock_state();
            self.decide(&mut state, key, &options)
        };

        if let Some(launch) = launch {
            if launch.send(fetcher().boxed()).is_err() {
                debug!(key, "Revalidation settled before its request was launched");
            }
        }

        match action {
            Action::Return(value) => Ok(value),
            Action::Wait(pending) => pending.await,
        }
    }

    fn decide(
        &self,
        state: &mut State<T>,
        key: &str,
        options: &FetchOptions,
    ) -> (Action<T>, Option<Launch<T>>) {
        let now = Instant::now();
        let pending = state.inflight.get(key);
        let age = state.store.get(key).map(|entry| entry.age_at(now));

        if let (Some(pending), Some(age)) = (&pending, age) {
            if age < options.deduping_interval {
                state.stats.record_dedup();
                debug!(key, ?age, "Joining in-flight fetch");
                return (Action::Wait(pending.clone()), None);
            }
        }

        let fresh = state
            .store
            .get(key)
            .filter(|entry| entry.is_fresh_at(now, options.cache_time))
            .map(|entry| {
                let refresh = entry.wants_background_refresh(now, options);
                (entry.value.clone(), refresh)
            });

        if let Some((value, wants_refresh)) = fresh {
            state.stats.record_hit();
            if wants_refresh && pending.is_none() {
                debug!(key, ?age, "Serving cached value, refreshing in background");
                state.stats.record_background_revalidation();
                // The spawned task drives the fetch; nobody waits on it here.
                let (_, launch) = self.dispatch(state, key);
                return (Action::Return(value), Some(launch));
            }
            return (Action::Return(value), None);
        }

        if let Some(pending) = pending {
            state.stats.record_dedup();
            debug!(key, ?age, "Cached value unusable, joining outstanding fetch");
            return (Action::Wait(pending), None);
        }

        state.stats.record_miss();
        debug!(key, ?age, "Cached value unusable, fetching");
        let (future, launch) = self.dispatch(state, key);
        (Action::Wait(future), Some(launch))
    }

    // == Dispatch ==
    /// Reserves the single-flight slot for `key`: flags the entry and
    /// registers a shared fetch that runs whatever request is sent through
    /// the returned [`Launch`]. The fetch is spawned so it always runs to
    /// completion, awaited or not.
    ///
    /// A fetcher that panics, or drops the launch without sending, settles
    /// as a failure so the key never stays stuck revalidating.
    fn dispatch(&self, state: &mut State<T>, key: &str) -> (SharedFetch<T>, Launch<T>) {
        let token = state.inflight.next_token();
        state.store.mark_revalidating(key);

        let (launch, request) = oneshot::channel::<BoxFuture<'static, anyhow::Result<T>>>();
        let inner: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        let owned_key = key.to_string();
        let future = async move {
            let result = match request.await {
                Ok(request) => AssertUnwindSafe(request)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        Err(anyhow!("fetcher panicked: {}", panic_reason(payload.as_ref())))
                    }),
                Err(_) => Err(anyhow!("fetcher panicked before returning a request")),
            };
            match inner.upgrade() {
                Some(inner) => SwrCache { inner }.settle(&owned_key, token, result),
                None => result.map_err(|err| SwrError::fetch(owned_key, err)),
            }
        }
        .boxed()
        .shared();

        state.inflight.register(key, token, future.clone());
        tokio::spawn(future.clone());
        (future, launch)
    }

    /// Applies a finished fetch. Only the fetch still registered for the key
    /// may write the store; one orphaned by an invalidation just resolves.
    fn settle(&self, key: &str, token: u64, result: anyhow::Result<T>) -> Result<T> {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        let current = state.inflight.release(key, token);

        match result {
            Ok(value) => {
                if current {
                    state.store.set(key, value.clone());
                    state.stats.set_total_entries(state.store.len());
                }
                drop(guard);

                if current {
                    debug!(key, "Revalidation settled");
                    self.notify(key);
                } else {
                    debug!(key, "Revalidation settled after invalidation, result not cached");
                }
                Ok(value)
            }
            Err(err) => {
                if current {
                    state.store.clear_revalidating(key);
                }
                state.stats.record_fetch_failure();
                drop(guard);

                let reason = format!("{err:#}");
                warn!(key, error = %reason, "Revalidation failed");
                Err(SwrError::fetch(key, err))
            }
        }
    }

    // == Inspection ==
    /// Returns the cached value for `key`, stale or not.
    pub fn get(&self, key: &str) -> Option<T> {
        self.lock_state()
            .store
            .get(key)
            .map(|entry| entry.value.clone())
    }

    /// Returns a copy of the full entry for `key`.
    pub fn entry(&self, key: &str) -> Option<CacheEntry<T>> {
        self.lock_state().store.get(key).cloned()
    }

    /// Returns true while a refresh for `key` is outstanding. For a key with
    /// no entry yet this reports whether its first fetch is in flight.
    pub fn is_validating(&self, key: &str) -> bool {
        let state = self.lock_state();
        match state.store.get(key) {
            Some(entry) => entry.is_revalidating,
            None => state.inflight.contains(key),
        }
    }

    /// Every cached key, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.lock_state().store.keys()
    }

    pub fn len(&self) -> usize {
        self.lock_state().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_state().store.is_empty()
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        let state = self.lock_state();
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.store.len());
        stats
    }

    // == Mutation ==
    /// Writes `value` under `key` (manual or optimistic update) and notifies
    /// subscribers before returning.
    pub fn set(&self, key: &str, value: T) {
        {
            let mut guard = self.lock_state();
            let state = &mut *guard;
            state.store.set(key, value);
            // A refresh still outstanding keeps the key revalidating.
            if state.inflight.contains(key) {
                state.store.mark_revalidating(key);
            }
            state.stats.set_total_entries(state.store.len());
        }
        debug!(key, "Value set");
        self.notify(key);
    }

    /// Removes `key` and forgets any outstanding fetch for it, so the next
    /// fetch always calls its fetcher. Subscribers are notified even when
    /// nothing was cached. Returns true if an entry was removed.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = {
            let mut guard = self.lock_state();
            let state = &mut *guard;
            let removed = state.store.delete(key);
            state.inflight.forget(key);
            state.stats.set_total_entries(state.store.len());
            removed
        };
        debug!(key, removed, "Key invalidated");
        self.notify(key);
        removed
    }

    /// Drops every entry and outstanding fetch, then notifies each key that
    /// has subscribers exactly once. Returns the number of entries removed.
    pub fn clear(&self) -> usize {
        let cleared = {
            let mut guard = self.lock_state();
            let state = &mut *guard;
            let cleared = state.store.clear().len();
            state.inflight.clear();
            state.stats.set_total_entries(0);
            cleared
        };

        let subscribed = lock(&self.inner.subscriptions).subscribed_keys();
        for key in &subscribed {
            self.notify(key);
        }
        info!(cleared, notified = subscribed.len(), "Cache cleared");
        cleared
    }

    // == Subscriptions ==
    /// Registers `callback` to run whenever `key` changes.
    ///
    /// The callback runs synchronously on the mutating caller, after the
    /// mutation, with no payload: read the cache for the current state. It
    /// must not synchronously mutate `key` itself.
    pub fn subscribe<F>(&self, key: &str, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = lock(&self.inner.subscriptions).subscribe(key, Arc::new(callback));
        debug!(key, id, "Subscribed");
        Subscription::new(&self.inner.subscriptions, key, id)
    }

    pub fn subscriber_count(&self, key: &str) -> usize {
        lock(&self.inner.subscriptions).subscriber_count(key)
    }

    /// Runs every callback registered for `key`, in registration order.
    /// Returns how many ran without panicking.
    pub fn notify(&self, key: &str) -> usize {
        let callbacks = lock(&self.inner.subscriptions).callbacks(key);
        self.lock_state().stats.record_notification();
        if callbacks.is_empty() {
            return 0;
        }
        deliver(key, &callbacks)
    }

    // == Environment Signals ==
    /// Focus regained: signal observers of every entry older than the
    /// focus threshold that is not already refreshing. Does not fetch.
    /// Returns the keys signalled.
    pub fn on_focus(&self) -> Vec<String> {
        if !self.inner.defaults.revalidate_on_focus {
            debug!("Focus signal ignored, disabled");
            return Vec::new();
        }
        let keys = self
            .lock_state()
            .store
            .stale_keys(Instant::now(), self.inner.focus_stale_threshold);
        for key in &keys {
            self.notify(key);
        }
        debug!(signalled = keys.len(), "Focus signal handled");
        keys
    }

    /// Connectivity restored: signal observers of every cached key.
    /// Returns the keys signalled.
    pub fn on_reconnect(&self) -> Vec<String> {
        if !self.inner.defaults.revalidate_on_reconnect {
            debug!("Reconnect signal ignored, disabled");
            return Vec::new();
        }
        let keys = self.keys();
        for key in &keys {
            self.notify(key);
        }
        debug!(signalled = keys.len(), "Reconnect signal handled");
        keys
    }
}
