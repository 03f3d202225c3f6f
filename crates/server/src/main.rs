//! The entry point of the bookshelf server
use anyhow::{Error, anyhow};
use bookshelf_server::{BookshelfServer, ServerConfig};
use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when `RUST_LOG` is unset or invalid
const DEFAULT_LOG_FILTER: &str = "info";

#[allow(
    clippy::print_stderr,
    reason = "Tracing might not be available here if run() failed before its initialization"
)]
#[allow(clippy::exit, reason = "Non-zero exit status on startup failure")]
#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Failed to run bookshelf server! Error: {error:#}");
        std::process::exit(1);
    }
}

/// Encapsulated run function that allows returning errors instead of panicking on `Err` variants.
async fn run() -> Result<(), Error> {
    // A missing .env file is fine, the process environment is used as is
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow!("Unable to set global tracing subscriber: {err}"))?;

    if !dotenv_loaded {
        tracing::info!("No .env file found, using process environment only");
    }

    let config = ServerConfig::from_env()?;
    tracing::info!("Starting bookshelf server with {config:?}");
    BookshelfServer::new(config).run().await?;
    Ok(())
}
