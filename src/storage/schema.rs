//! Database schema and connection pragmas.

use rusqlite::Connection;

/// The `messages` table. Column sizes document the accepted lengths, which
/// are enforced when rows are built (SQLite does not enforce them).
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id       INTEGER PRIMARY KEY NOT NULL,
    threadid INTEGER NOT NULL,
    type     VARCHAR(10) NOT NULL,
    read     BOOLEAN NOT NULL DEFAULT 1,
    sender   VARCHAR(40) DEFAULT 'Unknown',
    number   VARCHAR(30) DEFAULT 'N/A',
    received VARCHAR(30) NOT NULL,
    body     VARCHAR(500) NOT NULL
);
"#;

/// Apply per-connection pragmas.
///
/// WAL keeps readers (row counts, lookups) from blocking the commit, and the
/// busy timeout covers a second process opening the same file.
pub fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        PRAGMA foreign_keys = ON;
        "#,
    )
}

/// Create the schema if it does not exist yet. Safe to run repeatedly.
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(conn: &Connection) -> Vec<String> {
        let mut stmt = conn.prepare("PRAGMA table_info(messages)").unwrap();
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        names
    }

    #[test]
    fn test_initialize_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO messages (id, threadid, type, received, body) VALUES (1, 1, 'inbox', 'r', 'b')",
            [],
        )
        .unwrap();

        initialize_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            columns(&conn),
            ["id", "threadid", "type", "read", "sender", "number", "received", "body"]
        );
    }

    #[test]
    fn test_column_defaults() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO messages (id, threadid, type, received, body) VALUES (1, 1, 'inbox', 'r', 'b')",
            [],
        )
        .unwrap();

        let (read, sender, number): (bool, String, String) = conn
            .query_row("SELECT read, sender, number FROM messages WHERE id = 1", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .unwrap();
        assert!(read);
        assert_eq!(sender, "Unknown");
        assert_eq!(number, "N/A");
    }

    #[test]
    fn test_apply_pragmas() {
        let dir = tempfile::TempDir::new().unwrap();
        let conn = Connection::open(dir.path().join("pragma.db")).unwrap();
        apply_pragmas(&conn).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
