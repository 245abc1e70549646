//! # Harvest Reporter
//!
//! Territory reporter for harvested social event series: injection-safe
//! counts, grouped aggregates, paginated message listings and streamed
//! time-bucketed counts, served over a small REST API.
//!
//! ## Modules
//!
//! - [`store`]: Backing event store (SQLite) and statement types
//! - [`query`]: Parameter sanitizing, statement building and the query operations
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use harvest_reporter::query::{QueryExecutor, RawQueryParameters};
//! use harvest_reporter::store::SqliteStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::open("./events.db")?;
//!     store.create_schema()?;
//!     let executor = QueryExecutor::new(Arc::new(store));
//!
//!     let params = RawQueryParameters {
//!         territory: "north".to_string(),
//!         series: "messages".to_string(),
//!         field: "contributor_lang".to_string(),
//!         ..Default::default()
//!     }
//!     .validate()?;
//!
//!     let english = executor.count(&params, Some("en")).await?;
//!     println!("{} messages in English", english.count);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod query;
pub mod store;

// Re-export top-level types for convenience
pub use store::{EventStore, SqliteStore, StoreError, StoreResult};

pub use query::{
    BasicConditions, FieldCounts, MessagePage, QueryError, QueryExecutor, QueryParameters,
    RawQueryParameters, ResultCount, Series, TopPreset,
};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{
    ApiConfig as ConfigApiConfig, Config, ConfigError, HarvestConfig, LoggingConfig,
    StoreConfig, TerritoryConfig,
};
