//! Test utilities shared by the integration tests.
//!
//! Provides:
//! - Temporary database fixtures
//! - Synthetic message batches
//! - Shell-backed provider commands

#![allow(dead_code)]

use std::path::PathBuf;

use sqlsms::{CommandSource, MessageKind, Record, Store};
use tempfile::TempDir;

/// Test fixture that manages a temporary database directory.
///
/// The directory is automatically cleaned up when the fixture is dropped.
pub struct TestFixture {
    /// Temporary directory for test database
    pub temp_dir: TempDir,
    /// Path to the database file
    pub db_path: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture with a temporary database directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let db_path = temp_dir.path().join("mysms.db");
        Self { temp_dir, db_path }
    }

    /// Open the fixture's store.
    pub fn store(&self) -> Store {
        Store::open(&self.db_path, 4).expect("failed to open store")
    }

    /// Get the database path as a string.
    pub fn db_path_str(&self) -> &str {
        self.db_path.to_str().expect("invalid path")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// `n` distinct inbox/outbox messages spread over a few threads.
pub fn synthetic_records(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            let kind = if i % 3 == 0 {
                MessageKind::Outbox
            } else {
                MessageKind::Inbox
            };
            let mut record = Record::new(
                (i % 50) as i64,
                kind,
                format!("2024-01-01 00:{:02}", i % 60),
                format!("synthetic message {i}"),
            );
            record.number = format!("+1555{:07}", i % 1000);
            record
        })
        .collect()
}

/// Provider command that runs `script` through `sh`.
///
/// The provider flags land in `$1..$6`: `-d -l <limit> -n -t <box>`.
pub fn shell_provider(script: &str) -> CommandSource {
    CommandSource::new("sh").with_prefix_args(["-c", script, "sh"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.temp_dir.path().exists());
        assert!(fixture.db_path_str().ends_with("mysms.db"));
    }
}
