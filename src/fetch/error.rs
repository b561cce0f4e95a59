//! Tagged errors produced by fetch operations

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Whether retrying a failed fetch can help
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// Network or server trouble that may clear up on retry
    Transient,
    /// Authorization or not-found failures that retrying cannot fix
    Permanent,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::Transient => write!(f, "transient"),
            FetchErrorKind::Permanent => write!(f, "permanent"),
        }
    }
}

/// Error returned by a fetch operation
///
/// The fetcher only looks at [`FetchError::kind`] to decide whether to retry;
/// the error itself is handed back to the caller untouched.
#[derive(Debug, Error)]
#[error("{kind} fetch error{}: {message}", status_suffix(.status))]
pub struct FetchError {
    kind: FetchErrorKind,
    status: Option<u16>,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {})", s)).unwrap_or_default()
}

impl FetchError {
    fn new(kind: FetchErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            source: None,
        }
    }

    /// A failure worth retrying
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Transient, None, message)
    }

    /// A failure that must be surfaced without retrying
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Permanent, None, message)
    }

    /// Classifies an HTTP-like status code
    ///
    /// 401 and 404 are permanent; everything else is treated as transient.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(classify_status(status), Some(status), message)
    }

    /// Attaches the underlying cause
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_permanent(&self) -> bool {
        self.kind == FetchErrorKind::Permanent
    }

    pub fn is_transient(&self) -> bool {
        self.kind == FetchErrorKind::Transient
    }
}

/// Maps a status code to a retry classification
pub fn classify_status(status: u16) -> FetchErrorKind {
    match status {
        401 | 404 => FetchErrorKind::Permanent,
        _ => FetchErrorKind::Transient,
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        let classified = match err.status() {
            Some(status) => FetchError::from_status(status.as_u16(), message),
            None => FetchError::transient(message),
        };
        classified.with_source(err)
    }
}
