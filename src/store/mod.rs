//! Backing event store
//!
//! The query layer never talks to a database directly. It hands a built
//! [`Statement`] to an [`EventStore`] and maps the returned [`Row`]s:
//!
//! - **types**: `Statement`, `SqlValue`, `Row`
//! - **sqlite**: rusqlite implementation used by the server
//! - **schema**: series table definitions
//! - **error**: error types
//!
//! # Example
//!
//! ```rust,no_run
//! use harvest_reporter::store::{EventStore, SqliteStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::open("./events.db")?;
//!     store.create_schema()?;
//!
//!     println!("store reachable: {}", store.has_access().await);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod schema;
pub mod sqlite;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use error::{StoreError, StoreResult};
pub use sqlite::SqliteStore;
pub use types::{Row, SqlValue, Statement};

use async_trait::async_trait;

/// A relational store that runs built statements
///
/// Implementations must bind `Statement::params` with the driver's native
/// parameter mechanism and never splice them into the query text.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Short name of the backing engine, reported by `/database/info`
    fn kind(&self) -> &'static str;

    /// Run a statement and return every row
    async fn fetch(&self, statement: &Statement) -> StoreResult<Vec<Row>>;

    /// Check the store is reachable and the messages series readable
    async fn has_access(&self) -> bool {
        let check = Statement::new("SELECT COUNT(*) FROM messages".to_string(), Vec::new());
        match self.fetch(&check).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Event store access check failed");
                false
            }
        }
    }
}
