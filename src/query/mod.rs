//! Territory Query Engine
//!
//! Turns a handful of caller-supplied filter parameters into safe statements
//! over the harvested series and assembles the results:
//!
//! - **series**: the registry of datasets that may be named in a statement
//! - **params**: raw and sanitized parameters, pagination bounds
//! - **builder**: statement builder keeping identifiers and values apart
//! - **conditions**: message-only filters (gender, lang, country, geohash)
//! - **executor**: the store-facing executor and the simple counter
//! - **aggregate**: grouped/distinct field counts and the top-N presets
//! - **messages**: paginated message listing
//! - **timeseries**: windowed counts delivered as a stream
//!
//! # Data flow
//!
//! ```text
//! RawQueryParameters → sanitize/validate → QueryParameters
//!     → QueryExecutor::{count, field_counts, top, messages, timeseries_count}
//!     → Select → Statement → EventStore → results
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use harvest_reporter::query::{FieldExpr, QueryExecutor, RawQueryParameters};
//! use harvest_reporter::store::SqliteStore;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = QueryExecutor::new(Arc::new(SqliteStore::open("./events.db")?));
//!
//! let params = RawQueryParameters {
//!     territory: "north".to_string(),
//!     series: "messages".to_string(),
//!     from: "2014-10-01".to_string(),
//!     to: "2014-10-02".to_string(),
//!     ..Default::default()
//! }
//! .validate()?;
//!
//! let langs = FieldExpr::parse("contributor_lang").unwrap();
//! let counts = executor.field_counts(&params, &[langs], &[]).await?;
//! println!("{} messages", counts.total.count);
//! # Ok(())
//! # }
//! ```

mod aggregate;
mod builder;
mod conditions;
mod error;
mod executor;
mod messages;
mod params;
mod results;
mod series;
mod timeseries;

pub use aggregate::{TopPreset, DEFAULT_PRECISION};
pub use builder::{
    CompareOp, FieldExpr, FilterSet, Ident, Order, Predicate, Projection, Select, MAX_PRECISION,
    MIN_PRECISION,
};
pub use conditions::{BasicConditions, Gender};
pub use error::{QueryError, QueryResult};
pub use executor::QueryExecutor;
pub use params::{Pagination, QueryParameters, RawQueryParameters, DEFAULT_LIMIT, MAX_LIMIT};
pub use results::{
    AggregateFieldResult, FieldCounts, FromRow, MessagePage, MessageRecord, ResultCount,
    ValueCount, MESSAGE_COLUMNS,
};
pub use series::Series;
pub use timeseries::{
    CountStream, TimeWindow, TimeWindows, DAY_FORMAT, DEFAULT_MAX_WINDOWS, WINDOW_FORMAT,
};

#[cfg(test)]
pub(crate) use executor::tests::seeded_store;
