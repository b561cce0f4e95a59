//! AutoApplyPro fetch library
//!
//! Wraps async fetch operations with a read-through TTL cache and bounded
//! exponential-backoff retries. The cache store is injected, so the same
//! fetcher runs against memory, disk, or any other key-value backend.

pub mod cache;
pub mod cli;
pub mod fetch;
pub mod fetcher;

pub use cache::{CacheEntry, FileStore, KeyValueStore, MemoryStore, StoreError};
pub use fetch::{FetchError, FetchErrorKind, HttpJsonSource, RetryPolicy};
pub use fetcher::{CachedRetryFetcher, Clock, FetchOptions, SystemClock};
