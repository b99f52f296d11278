//! sqlsms: migrate device SMS messages into a SQLite database.
//!
//! Messages are pulled from the device provider command as one JSON array,
//! fanned out to a bounded pool of worker threads that convert each record
//! into a storage row, and fanned back into a single transactional commit.
//!
//! # Architecture
//!
//! - **Drain-once queue**: workers poll a FIFO queue without blocking
//! - **Bounded pool**: a fixed worker count, independent of batch size
//! - **Single writer**: staged rows are committed once, after every worker joined
//! - **Fail fast on retrieval**: provider errors abort before any write
//!
//! # Modules
//!
//! - [`config`]: CLI and environment configuration
//! - [`error`]: Error kinds reported to the user
//! - [`migrate`]: Orchestration of a migration run
//! - [`observability`]: Tracing setup
//! - [`pool`]: Worker pool
//! - [`queue`]: Job queue
//! - [`source`]: Record retrieval from the provider command
//! - [`storage`]: SQLite persistence layer

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions,    // source::SourceError is fine
    clippy::must_use_candidate,         // Not all functions need #[must_use]
    clippy::missing_errors_doc,         // Error docs can be verbose
    clippy::missing_panics_doc,         // Panic docs can be verbose
    clippy::needless_raw_string_hashes, // r#""# is fine for SQL
    clippy::struct_excessive_bools,     // Config structs may have flags
    clippy::too_many_lines              // Some functions are inherently long
)]

pub mod config;
pub mod error;
pub mod migrate;
pub mod observability;
pub mod pool;
pub mod queue;
pub mod source;
pub mod storage;

pub use error::{ErrorKind, MigrationError};
pub use migrate::{FailurePolicy, MigrationOptions, MigrationReport, Migrator};
pub use source::{CommandSource, MessageBox, MessageKind, Record, RecordSource};
pub use storage::{InsertMode, Session, StagedRow, Store};
