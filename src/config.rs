//! Configuration parsing for sqlsms.
//!
//! Supports:
//! - CLI arguments via clap
//! - Environment variable overrides
//! - Defaults matching the device provider's usual setup

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::MigrationError;
use crate::migrate::{FailurePolicy, MigrationOptions, DEFAULT_LIMIT, DEFAULT_WORKERS};
use crate::source::{CommandSource, MessageBox};
use crate::storage::InsertMode;

/// sqlsms: copy the text messages on this device into a SQLite database.
#[derive(Parser, Debug, Clone)]
#[command(name = "sqlsms")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// SQLite database file to write
    #[arg(short, long, env = "SQLSMS_DATABASE", default_value = "mysms.db")]
    pub database: PathBuf,

    /// Maximum number of messages to retrieve
    #[arg(short, long, env = "SQLSMS_LIMIT", default_value_t = DEFAULT_LIMIT)]
    pub limit: u32,

    /// Message box to retrieve (all, inbox, outbox, draft)
    #[arg(short = 'b', long = "box", env = "SQLSMS_BOX", default_value = "all")]
    pub mbox: String,

    /// Number of worker threads converting messages
    #[arg(short, long, env = "SQLSMS_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Seconds to wait for the provider command
    #[arg(long, env = "SQLSMS_TIMEOUT_SECS", default_value_t = 120)]
    pub timeout_secs: u64,

    /// Provider command that prints messages as JSON
    #[arg(long, env = "SQLSMS_COMMAND", default_value = CommandSource::DEFAULT_PROGRAM)]
    pub command: PathBuf,

    /// Size of the database connection pool
    #[arg(long, env = "SQLSMS_POOL_SIZE", default_value_t = 4)]
    pub pool_size: u32,

    /// Replace messages whose id already exists instead of failing
    #[arg(long, env = "SQLSMS_REPLACE")]
    pub replace: bool,

    /// Write nothing if any message fails to convert
    #[arg(long, env = "SQLSMS_FAIL_FAST")]
    pub fail_fast: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Parse configuration from CLI arguments and environment.
    ///
    /// Help and version requests come back as errors too; see
    /// [`clap::Error::use_stderr`].
    pub fn try_parse_args() -> Result<Self, clap::Error> {
        Self::try_parse()
    }

    /// Validate the run parameters.
    pub fn migration_options(&self) -> Result<MigrationOptions, MigrationError> {
        let mbox: MessageBox = self
            .mbox
            .parse()
            .map_err(|e| MigrationError::InvalidParameter(format!("{e}")))?;

        let options = MigrationOptions {
            limit: self.limit,
            mbox,
            insert_mode: if self.replace {
                InsertMode::Replace
            } else {
                InsertMode::Insert
            },
            failure_policy: if self.fail_fast {
                FailurePolicy::FailFast
            } else {
                FailurePolicy::Collect
            },
            ..MigrationOptions::default()
        };
        options.with_workers(self.workers)
    }

    /// Build the provider command source.
    pub fn command_source(&self) -> Result<CommandSource, MigrationError> {
        if self.timeout_secs == 0 {
            return Err(MigrationError::InvalidParameter(
                "timeout must be at least 1 second".into(),
            ));
        }
        Ok(CommandSource::new(&self.command).with_timeout(Duration::from_secs(self.timeout_secs)))
    }

    /// Validated connection pool size.
    pub fn pool_size(&self) -> Result<u32, MigrationError> {
        if self.pool_size == 0 {
            return Err(MigrationError::InvalidParameter(
                "pool size must be at least 1".into(),
            ));
        }
        Ok(self.pool_size)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("mysms.db"),
            limit: DEFAULT_LIMIT,
            mbox: "all".into(),
            workers: DEFAULT_WORKERS,
            timeout_secs: 120,
            command: PathBuf::from(CommandSource::DEFAULT_PROGRAM),
            pool_size: 4,
            replace: false,
            fail_fast: false,
            log_level: "info".into(),
        }
    }
}
