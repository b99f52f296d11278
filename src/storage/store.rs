//! Pooled access to the messages database.
//!
//! Uses r2d2 with r2d2_sqlite. Every pooled connection gets the standard
//! pragmas; opening the store also creates the schema if needed.

use std::path::{Path, PathBuf};

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};

use super::row::StagedRow;
use super::schema::{apply_pragmas, initialize_schema};
use super::session::{InsertMode, Session};
use super::StorageError;

/// Handle to one database file.
#[derive(Clone)]
pub struct Store {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl Store {
    /// Open (or create) the database at `db_path` and make sure the schema exists.
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the SQLite database file
    /// * `max_size` - Maximum number of connections in the pool (at least 1)
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created or the schema cannot
    /// be applied. Opening an already initialized file is not an error.
    pub fn open<P: AsRef<Path>>(db_path: P, max_size: u32) -> Result<Self, StorageError> {
        let path = db_path.as_ref().to_path_buf();

        // Open directly first: r2d2 retries failed connections until its
        // timeout, a plain open fails immediately on a bad path.
        {
            let conn = Connection::open(&path)?;
            apply_pragmas(&conn)?;
            initialize_schema(&conn)?;
        }

        let manager = SqliteConnectionManager::file(&path);

        let pool = Pool::builder()
            .max_size(max_size.max(1))
            .connection_customizer(Box::new(PragmaCustomizer))
            .build(manager)?;

        let store = Self { pool, path };
        tracing::debug!(path = %store.path.display(), max_size, "Opened message store");
        Ok(store)
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a connection from the pool.
    pub fn get(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        Ok(self.pool.get()?)
    }

    /// Create the schema if missing. Existing tables and rows are untouched.
    pub fn ensure_schema(&self) -> Result<(), StorageError> {
        let conn = self.get()?;
        initialize_schema(&conn)?;
        Ok(())
    }

    /// Start a new write session.
    pub fn session(&self, mode: InsertMode) -> Session {
        Session::new(self.clone(), mode)
    }

    /// Number of stored messages.
    pub fn count_messages(&self) -> Result<u64, StorageError> {
        let conn = self.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// All message ids in ascending order.
    pub fn message_ids(&self) -> Result<Vec<i64>, StorageError> {
        let conn = self.get()?;
        let mut stmt = conn.prepare("SELECT id FROM messages ORDER BY id ASC")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// Load one message by id.
    pub fn get_message(&self, id: i64) -> Result<Option<StagedRow>, StorageError> {
        let conn = self.get()?;
        let row = conn
            .query_row(
                "SELECT id, threadid, type, read, sender, number, received, body
                 FROM messages WHERE id = ?1",
                params![id],
                |row| {
                    Ok(StagedRow {
                        id: row.get(0)?,
                        thread_id: row.get(1)?,
                        kind: row.get(2)?,
                        read: row.get(3)?,
                        sender: row.get(4)?,
                        number: row.get(5)?,
                        received: row.get(6)?,
                        body: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

/// Connection customizer that applies the standard pragmas.
#[derive(Debug)]
struct PragmaCustomizer;

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        apply_pragmas(conn)
    }
}
