//! Command-line interface parsing for the AutoApplyPro fetcher
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! the options and stores the library needs.

use chrono::DateTime;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::cache::{CacheEntry, FileStore, KeyValueStore, StoreError};
use crate::fetch::RetryPolicy;
use crate::fetcher::{FetchOptions, DEFAULT_TTL};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The cache key is empty
    #[error("Invalid cache key: the key must not be empty")]
    EmptyKey,

    /// No cache directory was given and none could be determined
    #[error("Could not determine a cache directory; pass --cache-dir")]
    NoCacheDir,
}

/// AutoApplyPro fetcher - cached, retrying JSON fetches against the job API
#[derive(Parser, Debug)]
#[command(name = "autoapply")]
#[command(about = "Cached, retrying JSON fetches for AutoApplyPro")]
#[command(version)]
pub struct Cli {
    /// Directory for cached responses (defaults to the platform cache directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a JSON document, serving it from cache while fresh
    ///
    /// Examples:
    ///   autoapply fetch https://api.autoapplypro.com/api/jobs
    ///   autoapply fetch https://api.autoapplypro.com/api/jobs/1 --key job:1 --ttl-ms 5000
    Fetch(FetchArgs),

    /// Show the cached entry stored under a key
    Inspect {
        /// Cache key to look up
        key: String,
    },
}

/// Arguments for `autoapply fetch`
#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// URL of the JSON document
    pub url: String,

    /// Cache key (defaults to `url:<URL>`)
    #[arg(long)]
    pub key: Option<String>,

    /// Cache lifetime in milliseconds
    #[arg(long, default_value_t = DEFAULT_TTL.as_millis() as u64)]
    pub ttl_ms: u64,

    /// Retries after the first failed attempt
    #[arg(long, default_value_t = RetryPolicy::default().max_retries)]
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds; doubles on each retry
    #[arg(long, default_value_t = RetryPolicy::default().base_delay.as_millis() as u64)]
    pub base_delay_ms: u64,

    /// Bearer token sent in the Authorization header
    #[arg(long, env = "AUTOAPPLY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

impl FetchArgs {
    /// Cache key for this fetch
    ///
    /// # Returns
    /// * `Ok(String)` - the explicit `--key`, or `url:<URL>` when none was given
    /// * `Err(CliError::EmptyKey)` - if `--key` was given but empty
    pub fn cache_key(&self) -> Result<String, CliError> {
        match &self.key {
            Some(key) if key.is_empty() => Err(CliError::EmptyKey),
            Some(key) => Ok(key.clone()),
            None => Ok(format!("url:{}", self.url)),
        }
    }

    /// Options derived from the TTL and retry flags
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::default()
            .with_ttl(Duration::from_millis(self.ttl_ms))
            .with_max_retries(self.max_retries)
            .with_base_delay(Duration::from_millis(self.base_delay_ms))
    }
}

impl Cli {
    /// Opens the file store selected by `--cache-dir` or the platform default
    pub fn file_store(&self) -> Result<FileStore, CliError> {
        match &self.cache_dir {
            Some(dir) => Ok(FileStore::with_dir(dir)),
            None => FileStore::new().ok_or(CliError::NoCacheDir),
        }
    }
}

/// Renders a human-readable report of the entry cached under `key`
///
/// Malformed entries are reported rather than treated as errors; only a
/// failing store read is returned as `Err`.
pub fn describe_entry(
    store: &impl KeyValueStore,
    key: &str,
    now_ms: i64,
) -> Result<String, StoreError> {
    let Some(raw) = store.get(key)? else {
        return Ok(format!("No cached entry for '{}'", key));
    };
    let Some(entry) = CacheEntry::<Value>::decode(&raw) else {
        return Ok(format!("Cached entry for '{}' is malformed and will be ignored", key));
    };

    let expiry = DateTime::from_timestamp_millis(entry.expiry)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| entry.expiry.to_string());
    let state = if entry.is_fresh(now_ms) { "fresh" } else { "stale" };
    let data = serde_json::to_string_pretty(&entry.data)?;

    Ok(format!(
        "key:    {}\nexpiry: {} ({})\ndata:\n{}",
        key, expiry, state, data
    ))
}
