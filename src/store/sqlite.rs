//! SQLite event store
//!
//! Runs built statements against a SQLite database with rusqlite. Every
//! literal goes through `params_from_iter`; the statement text is taken
//! as-is from the query builder, which only ever interpolates whitelisted
//! identifiers.
//!
//! The connection is shared behind a `Mutex` and statements run on the
//! blocking pool so request tasks never stall the runtime.

use crate::query::Series;
use crate::store::error::{StoreError, StoreResult};
use crate::store::schema;
use crate::store::types::{Row, SqlValue, Statement};
use crate::store::EventStore;
use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// SQLite-backed event store
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        tracing::debug!(path = ?path, "Opened SQLite event store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Open the database named by `path`, where `:memory:` selects an
    /// in-memory database
    pub fn open_path(path: &str) -> StoreResult<Self> {
        if path.trim().is_empty() {
            return Err(StoreError::Config("store path is empty".to_string()));
        }
        if path == ":memory:" {
            Self::open_in_memory()
        } else {
            Self::open(path)
        }
    }

    /// Database file path, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Create every series table and its index if missing
    pub fn create_schema(&self) -> StoreResult<()> {
        self.with_connection(|conn| {
            for series in Series::ALL {
                conn.execute(schema::table_ddl(series), [])?;
                conn.execute(&schema::index_ddl(series), [])?;
            }
            Ok(())
        })?;

        tracing::info!(series = Series::ALL.len(), "Event store schema ready");
        Ok(())
    }

    /// Run a closure against the underlying connection
    ///
    /// Used for seeding and maintenance; query paths go through
    /// [`EventStore::fetch`].
    pub fn with_connection<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        Ok(f(&conn)?)
    }
}

/// Execute one statement and collect its rows
fn run_statement(conn: &Mutex<Connection>, statement: &Statement) -> StoreResult<Vec<Row>> {
    let conn = conn.lock().map_err(|e| StoreError::Lock(e.to_string()))?;

    let mut stmt = conn.prepare_cached(statement.sql())?;
    let column_count = stmt.column_count();

    let rows = stmt.query_map(params_from_iter(statement.params().iter()), |row| {
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            values.push(SqlValue::from(row.get::<_, Value>(idx)?));
        }
        Ok(Row::new(values))
    })?;

    let collected: Result<Vec<Row>, rusqlite::Error> = rows.collect();
    Ok(collected?)
}

#[async_trait]
impl EventStore for SqliteStore {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    async fn fetch(&self, statement: &Statement) -> StoreResult<Vec<Row>> {
        let conn = Arc::clone(&self.conn);
        let statement = statement.clone();

        tracing::debug!(sql = %statement, "Executing statement");

        tokio::task::spawn_blocking(move || run_statement(&conn, &statement)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_schema().unwrap();
        store
            .with_connection(|conn| {
                conn.execute_batch(
                    "INSERT INTO messages (time, territory, network, contributor_lang)
                     VALUES ('2014-10-01 10:00:00', 'north', 'twitter', 'en'),
                            ('2014-10-01 11:00:00', 'north', 'facebook', 'fr')",
                )
            })
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_fetch_binds_parameters() {
        let store = seeded_store();

        let stmt = Statement::new(
            "SELECT COUNT(*) FROM messages WHERE territory = ?1 AND network = ?2".to_string(),
            vec![SqlValue::text("north"), SqlValue::text("twitter")],
        );
        let rows = store.fetch(&stmt).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_count(0).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bound_value_is_not_interpreted() {
        let store = seeded_store();

        let stmt = Statement::new(
            "SELECT COUNT(*) FROM messages WHERE territory = ?1".to_string(),
            vec![SqlValue::text("north' OR '1'='1")],
        );
        let rows = store.fetch(&stmt).await.unwrap();

        assert_eq!(rows[0].get_count(0).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fetch_error_surfaces() {
        let store = seeded_store();

        let stmt = Statement::new("SELECT nope FROM nowhere".to_string(), Vec::new());
        let result = store.fetch(&stmt).await;

        assert!(matches!(result, Err(StoreError::Sqlite(_))));
    }

    #[tokio::test]
    async fn test_has_access() {
        let store = seeded_store();
        assert!(store.has_access().await);

        let empty = SqliteStore::open_in_memory().unwrap();
        assert!(!empty.has_access().await);
    }

    #[tokio::test]
    async fn test_open_file_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("events.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.create_schema().unwrap();
            store
                .with_connection(|conn| {
                    conn.execute(
                        "INSERT INTO hashtags (time, territory, tag) VALUES ('2014-10-01 00:00:00', 'north', 'rust')",
                        [],
                    )
                })
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));

        let stmt = Statement::new("SELECT COUNT(*) FROM hashtags".to_string(), Vec::new());
        let rows = store.fetch(&stmt).await.unwrap();
        assert_eq!(rows[0].get_count(0).unwrap(), 1);
    }

    #[test]
    fn test_open_path_rejects_empty() {
        assert!(matches!(
            SqliteStore::open_path("  "),
            Err(StoreError::Config(_))
        ));
        assert!(SqliteStore::open_path(":memory:").unwrap().path().is_none());
    }
}
