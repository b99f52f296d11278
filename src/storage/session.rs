//! Write sessions.
//!
//! A session buffers rows appended concurrently by workers. Nothing touches
//! the database until [`Session::commit`], which writes the whole buffer in a
//! single transaction. Commit and rollback consume the session, so each
//! session is finished exactly once.

use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, TransactionBehavior};

use super::row::StagedRow;
use super::store::Store;
use super::StorageError;

/// How rows whose id already exists in the table are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InsertMode {
    /// Plain insert; an existing id fails the commit and nothing is written.
    #[default]
    Insert,
    /// Existing rows with the same id are replaced.
    Replace,
}

impl InsertMode {
    fn statement(self) -> &'static str {
        match self {
            Self::Insert => {
                "INSERT INTO messages (id, threadid, type, read, sender, number, received, body)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            }
            Self::Replace => {
                "INSERT OR REPLACE INTO messages (id, threadid, type, read, sender, number, received, body)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            }
        }
    }
}

/// Transactional write context shared by workers.
pub struct Session {
    store: Store,
    mode: InsertMode,
    staged: Mutex<Vec<StagedRow>>,
}

impl Session {
    pub(crate) fn new(store: Store, mode: InsertMode) -> Self {
        Self {
            store,
            mode,
            staged: Mutex::new(Vec::new()),
        }
    }

    pub fn mode(&self) -> InsertMode {
        self.mode
    }

    /// Stage a row. Safe to call from many threads.
    pub fn append(&self, row: StagedRow) {
        self.lock().push(row);
    }

    /// Number of staged rows.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Write every staged row in one transaction, ordered by id.
    ///
    /// Returns the number of rows written. On error the transaction is
    /// rolled back and the table is left as it was before the call.
    pub fn commit(self) -> Result<usize, StorageError> {
        let mut rows = self
            .staged
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        rows.sort_unstable_by_key(|row| row.id);

        let mut conn = self.store.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut stmt = tx.prepare_cached(self.mode.statement())?;
            for row in &rows {
                stmt.execute(params![
                    row.id,
                    row.thread_id,
                    row.kind,
                    row.read,
                    row.sender,
                    row.number,
                    row.received,
                    row.body,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(rows = rows.len(), mode = ?self.mode, "Session committed");
        Ok(rows.len())
    }

    /// Discard every staged row. Returns how many were dropped.
    pub fn rollback(self) -> usize {
        let dropped = self
            .staged
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        tracing::debug!(rows = dropped, "Session rolled back");
        dropped
    }

    // A push either happened or it did not, so a poisoned buffer is intact.
    fn lock(&self) -> MutexGuard<'_, Vec<StagedRow>> {
        self.staged.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("path", &self.store.path())
            .field("mode", &self.mode)
            .field("staged", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn row(id: i64, body: &str) -> StagedRow {
        StagedRow {
            id,
            thread_id: 1,
            kind: "inbox".into(),
            read: true,
            sender: "Unknown".into(),
            number: "N/A".into(),
            received: "2023-01-01 00:00".into(),
            body: body.into(),
        }
    }

    fn open_store(dir: &TempDir) -> Store {
        Store::open(dir.path().join("session.db"), 2).unwrap()
    }

    #[test]
    fn test_nothing_written_before_commit() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let session = store.session(InsertMode::Insert);

        session.append(row(2, "b"));
        session.append(row(1, "a"));
        assert_eq!(session.len(), 2);
        assert_eq!(store.count_messages().unwrap(), 0);

        assert_eq!(session.commit().unwrap(), 2);
        assert_eq!(store.message_ids().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_rollback_discards_rows() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let session = store.session(InsertMode::Insert);
        session.append(row(1, "a"));

        assert_eq!(session.rollback(), 1);
        assert_eq!(store.count_messages().unwrap(), 0);
    }

    #[test]
    fn test_failed_commit_leaves_table_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let first = store.session(InsertMode::Insert);
        first.append(row(5, "original"));
        first.commit().unwrap();

        // Ids 1..4 would insert fine; id 5 collides and must undo them.
        let second = store.session(InsertMode::Insert);
        for id in 1..=5 {
            second.append(row(id, "new"));
        }
        assert!(second.commit().is_err());

        assert_eq!(store.message_ids().unwrap(), vec![5]);
        assert_eq!(store.get_message(5).unwrap().unwrap().body, "original");
    }

    #[test]
    fn test_replace_mode_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let first = store.session(InsertMode::Insert);
        first.append(row(1, "old"));
        first.commit().unwrap();

        let second = store.session(InsertMode::Replace);
        assert_eq!(second.mode(), InsertMode::Replace);
        second.append(row(1, "new"));
        second.append(row(2, "extra"));
        assert_eq!(second.commit().unwrap(), 2);

        assert_eq!(store.count_messages().unwrap(), 2);
        assert_eq!(store.get_message(1).unwrap().unwrap().body, "new");
    }

    #[test]
    fn test_concurrent_append() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let session = Arc::new(store.session(InsertMode::Insert));

        let handles: Vec<_> = (0..10)
            .map(|t| {
                let session = Arc::clone(&session);
                thread::spawn(move || {
                    for i in 0..100 {
                        session.append(row(t * 100 + i + 1, "x"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let session = Arc::into_inner(session).unwrap();
        assert_eq!(session.commit().unwrap(), 1000);
        assert_eq!(store.message_ids().unwrap(), (1..=1000).collect::<Vec<_>>());
    }
}
