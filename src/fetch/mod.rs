//! Fetch operations and their failure model
//!
//! A fetch operation is any zero-argument async closure returning
//! `Result<T, FetchError>`. Errors carry an explicit [`FetchErrorKind`] so the
//! fetcher can tell transient failures (retried with backoff) from permanent
//! ones (surfaced immediately).

pub mod error;
pub mod http;
pub mod retry;

pub use error::{classify_status, FetchError, FetchErrorKind};
pub use http::HttpJsonSource;
pub use retry::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES};
