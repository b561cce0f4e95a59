//! Cache storage for fetched API responses
//!
//! Entries are stored as JSON strings carrying an absolute expiry timestamp.
//! The storage medium is injected through the [`KeyValueStore`] trait.

mod entry;
mod store;

pub use entry::CacheEntry;
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
