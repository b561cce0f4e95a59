//! AutoApplyPro fetcher - cached, retrying JSON fetches from the command line
//!
//! Fetches JSON documents from the AutoApplyPro API through the on-disk
//! cache, and inspects what is currently cached.

use clap::Parser;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use autoapply::cache::KeyValueStore;
use autoapply::cli::{describe_entry, Cli, Command, FetchArgs};
use autoapply::fetch::HttpJsonSource;
use autoapply::fetcher::{CachedRetryFetcher, Clock, SystemClock};

/// Fetches `args.url` through the cache and prints the JSON document
async fn run_fetch(
    store: impl KeyValueStore,
    args: &FetchArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = args.cache_key()?;
    let fetcher = CachedRetryFetcher::new(store).with_options(args.fetch_options());

    let mut source = HttpJsonSource::new();
    if let Some(token) = &args.token {
        source = source.with_bearer_token(token);
    }

    let value: Value = fetcher.fetch(&key, source.operation(&args.url)).await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout stays pipeable JSON
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let store = cli.file_store()?;

    match &cli.command {
        Command::Fetch(args) => run_fetch(store, args).await?,
        Command::Inspect { key } => {
            println!("{}", describe_entry(&store, key, SystemClock.now_ms())?);
        }
    }

    Ok(())
}
