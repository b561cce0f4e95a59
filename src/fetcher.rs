//! Read-through cache with retry for async fetch operations
//!
//! [`CachedRetryFetcher`] serves a fresh cached value when one exists and
//! otherwise runs the supplied fetch operation, retrying transient failures
//! with exponential backoff and writing successful results back to the store.
//!
//! Concurrent calls for the same key do not coordinate: both may miss the
//! cache and both run the operation. The last successful write wins.

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, KeyValueStore};
use crate::fetch::{FetchError, RetryPolicy};

/// Default lifetime of a cached value (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// Source of the current time in milliseconds since the Unix epoch
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Cache lifetime and retry behavior for a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// How long a successful result stays fresh
    pub ttl: Duration,
    /// Retry budget for transient failures
    pub retry: RetryPolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            retry: RetryPolicy::default(),
        }
    }
}

impl FetchOptions {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.retry.base_delay = base_delay;
        self
    }
}

/// Wraps fetch operations with a TTL cache and bounded retries
///
/// The backing store is injected, so the same fetcher works against memory,
/// disk, or any other [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct CachedRetryFetcher<S, C = SystemClock> {
    store: S,
    clock: C,
    options: FetchOptions,
}

impl<S: KeyValueStore> CachedRetryFetcher<S> {
    /// Creates a fetcher using wall-clock time and default options
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> CachedRetryFetcher<S, C> {
    /// Creates a fetcher with a custom time source
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            options: FetchOptions::default(),
        }
    }

    /// Replaces the options used by [`fetch`](Self::fetch)
    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the cached value for `key` if it is still fresh
    ///
    /// Missing, expired, unreadable and malformed entries all yield `None`.
    pub fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };
        let entry = CacheEntry::<T>::decode(&raw)?;
        let now = self.clock.now_ms();
        if entry.is_fresh(now) {
            Some(entry.data)
        } else {
            debug!(key, expiry = entry.expiry, now, "Cache entry expired");
            None
        }
    }

    /// Fetches `key` with an explicit TTL and retry budget
    ///
    /// The delay between retries starts at the fetcher's configured base
    /// delay (1 second by default) and doubles each time.
    pub async fn fetch_with_cache<T, F, Fut>(
        &self,
        key: &str,
        fetch_operation: F,
        ttl: Duration,
        max_retries: u32,
    ) -> Result<T, FetchError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let options = self.options.with_ttl(ttl).with_max_retries(max_retries);
        self.fetch_with_options(key, fetch_operation, &options).await
    }

    /// Fetches `key` using the fetcher's default options
    pub async fn fetch<T, F, Fut>(&self, key: &str, fetch_operation: F) -> Result<T, FetchError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let options = self.options;
        self.fetch_with_options(key, fetch_operation, &options).await
    }

    /// Serves `key` from cache or runs `fetch_operation` with retries
    ///
    /// # Behavior
    /// - A fresh cache entry is returned without calling the operation
    /// - Otherwise the operation runs up to `max_retries + 1` times, sleeping
    ///   `base_delay * 2^(n-1)` before retry `n`
    /// - A permanent error stops retrying and is returned as is
    /// - The first success is written to the store with `expiry = now + ttl`
    /// - When attempts run out, the last error is returned and nothing is cached
    pub async fn fetch_with_options<T, F, Fut>(
        &self,
        key: &str,
        mut fetch_operation: F,
        options: &FetchOptions,
    ) -> Result<T, FetchError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        if key.is_empty() {
            return Err(FetchError::permanent("cache key must not be empty"));
        }

        if let Some(data) = self.cached(key) {
            debug!(key, "Cache hit");
            return Ok(data);
        }
        debug!(key, "Cache miss");

        let total_attempts = options.retry.total_attempts();
        let mut attempt: u32 = 0;
        loop {
            let delay = options.retry.delay_for(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match fetch_operation().await {
                Ok(data) => {
                    self.write_entry(key, &data, options.ttl);
                    return Ok(data);
                }
                Err(err) if err.is_permanent() => {
                    warn!(key, attempt, error = %err, "Permanent fetch failure, not retrying");
                    return Err(err);
                }
                Err(err) => {
                    attempt += 1;
                    if attempt >= total_attempts {
                        warn!(key, attempts = attempt, error = %err, "Fetch failed, retries exhausted");
                        return Err(err);
                    }
                    warn!(
                        key,
                        attempt,
                        delay_ms = u64::try_from(options.retry.delay_for(attempt).as_millis())
                            .unwrap_or(u64::MAX),
                        error = %err,
                        "Transient fetch failure, retrying"
                    );
                }
            }
        }
    }

    /// Stores a fetched value; failures are logged rather than returned
    fn write_entry<T: Serialize>(&self, key: &str, data: &T, ttl: Duration) {
        let entry = CacheEntry::new(data, self.clock.now_ms(), ttl);
        let result = entry
            .encode()
            .and_then(|raw| self.store.set(key, raw));
        match result {
            Ok(()) => debug!(key, expiry = entry.expiry, "Cached fetch result"),
            Err(e) => warn!(key, error = %e, "Failed to cache fetch result"),
        }
    }
}
