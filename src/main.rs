//! Reporter API Server
//!
//! Run with: cargo run --bin reporter [-- path/to/config.toml]
//!
//! # Configuration
//!
//! The config file is taken from the first argument, else from the default
//! locations (see [`Config::load_default`]). Environment variables override it:
//! - `REPORTER_STORE_PATH`: SQLite database file
//! - `REPORTER_API_HOST` / `REPORTER_API_PORT`: Bind address
//! - `REPORTER_MAX_TIMESERIES_WINDOWS`: Window cap per time series request
//! - `REPORTER_LOG_LEVEL` / `REPORTER_LOG_FORMAT`: Logging
//! - `RUST_LOG`: Log filter, wins over the configured level

use harvest_reporter::api::{serve, ApiConfig, AppState};
use harvest_reporter::config::{Config, LoggingConfig};
use harvest_reporter::query::QueryExecutor;
use harvest_reporter::store::SqliteStore;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => Config::load_with_env(&path)?,
        None => Config::load_default(),
    };

    init_tracing(&config.logging)?;

    tracing::info!("Starting Reporter API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Event store: {}", config.store.path);

    let store = SqliteStore::open_path(&config.store.path)?;
    if config.store.create_schema {
        store.create_schema()?;
        tracing::info!("Series tables ready");
    }

    let executor = Arc::new(
        QueryExecutor::new(Arc::new(store))
            .with_max_windows(config.query.max_timeseries_windows),
    );
    let api_config = ApiConfig::from(&config.api);

    tracing::info!(
        territories = config.harvest.territories.len(),
        "Configured territories loaded"
    );

    let state = AppState::new(executor, api_config.clone(), config.harvest.territories);
    serve(state, &api_config).await?;

    tracing::info!("Reporter API server stopped");
    Ok(())
}

/// Install the global subscriber: `RUST_LOG` or the configured level,
/// pretty or JSON lines, to stderr or the configured file
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "harvest_reporter={level},reporter={level},tower_http={level}",
            level = logging.level
        ))
    });

    let json = logging.format.eq_ignore_ascii_case("json");

    match &logging.file {
        Some(path) => {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let writer = Mutex::new(file);

            if json {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                    .init();
            }
        }
        None => {
            if json {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer().json())
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer())
                    .init();
            }
        }
    }

    Ok(())
}
