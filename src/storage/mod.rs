//! SQLite storage layer for sqlsms.
//!
//! Provides:
//! - Schema initialization (idempotent) and connection pragmas
//! - A pooled store over a single database file
//! - Explicit Record to row conversion
//! - Sessions that stage rows from many workers and commit them once

pub mod row;
pub mod schema;
pub mod session;
pub mod store;

pub use row::{ConversionError, StagedRow};
pub use session::{InsertMode, Session};
pub use store::Store;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}
