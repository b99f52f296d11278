//! sqlsms: copy device text messages into a SQLite database.
//!
//! # Usage
//!
//! ```bash
//! sqlsms --database mysms.db --limit 5000 --box all --workers 75
//! ```
//!
//! Environment variables can also be used:
//! - `SQLSMS_DATABASE`: Database file to write
//! - `SQLSMS_LIMIT`: Maximum number of messages to retrieve
//! - `SQLSMS_BOX`: Message box (all, inbox, outbox, draft)
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use std::process::ExitCode;

use anyhow::Context;
use sqlsms::config::Config;
use sqlsms::observability::tracing::init_tracing;
use sqlsms::{ErrorKind, MigrationError, MigrationReport, Migrator, Store};

const ISSUES_HINT: &str =
    "If this issue persists, make sure the Termux:API app and the termux-api package are installed.";

/// Print startup banner with version and configuration.
fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        r#"
  sqlsms v{}

  Configuration:
    Database:   {}
    Limit:      {}
    Box:        {}
    Workers:    {}
    Provider:   {}
"#,
        version,
        config.database.display(),
        config.limit,
        config.mbox,
        config.workers,
        config.command.display(),
    );
}

/// Usage errors are invalid parameters, reported like any other failure.
fn usage_error(e: &clap::Error) -> MigrationError {
    let rendered = e.to_string();
    let message = rendered
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches("error: ");
    MigrationError::InvalidParameter(message.to_string())
}

fn report_failure(e: &MigrationError) {
    eprintln!("error[{}]: {e}", e.kind());
    if e.kind() == ErrorKind::ProviderUnavailable {
        eprintln!("\n{ISSUES_HINT}");
    }
}

async fn run(config: &Config) -> Result<MigrationReport, MigrationError> {
    let options = config.migration_options()?;
    let source = config.command_source()?;
    let store =
        Store::open(&config.database, config.pool_size()?).map_err(MigrationError::StorageInit)?;

    Migrator::new(store, source).migrate(&options).await
}

fn main() -> anyhow::Result<ExitCode> {
    // Parse configuration from CLI arguments and environment
    let config = match Config::try_parse_args() {
        Ok(config) => config,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            report_failure(&usage_error(&e));
            return Ok(ExitCode::FAILURE);
        }
    };

    // Initialize tracing/logging
    init_tracing(&config.log_level);

    // Print startup banner
    print_banner(&config);

    // The provider call is the only async work; workers are plain threads.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    match runtime.block_on(run(&config)) {
        Ok(report) => {
            println!("{report}");
            if report.is_complete() {
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("warning: migration was partial, see the failures above");
                Ok(ExitCode::from(2))
            }
        }
        Err(e) => {
            tracing::error!(kind = %e.kind(), error = %e, "Migration failed");
            report_failure(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}
