//! Top-level migration errors.
//!
//! Every failure a migration can report maps to one [`ErrorKind`]. The set of
//! kinds is closed; details travel in the error's message.

use std::fmt;

use thiserror::Error;

use crate::pool::PoolError;
use crate::source::SourceError;
use crate::storage::StorageError;

/// Category of a migration failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ProviderUnavailable,
    RetrievalTimeout,
    RetrievalFailed,
    StorageInitFailed,
    StorageCommitFailed,
    InvalidParameter,
    ConversionFailed,
    WorkerPoolFailed,
}

impl ErrorKind {
    /// Stable name used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProviderUnavailable => "provider_unavailable",
            Self::RetrievalTimeout => "retrieval_timeout",
            Self::RetrievalFailed => "retrieval_failed",
            Self::StorageInitFailed => "storage_init_failed",
            Self::StorageCommitFailed => "storage_commit_failed",
            Self::InvalidParameter => "invalid_parameter",
            Self::ConversionFailed => "conversion_failed",
            Self::WorkerPoolFailed => "worker_pool_failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for a migration run.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Unable to create SMS database: {0}")]
    StorageInit(#[source] StorageError),

    #[error("Failed to commit messages: {0}")]
    StorageCommit(#[source] StorageError),

    #[error("{} message(s) could not be converted, nothing was written: {}", .0.len(), summarize(.0))]
    ConversionFailed(Vec<String>),

    #[error("Worker pool failed: {0}")]
    WorkerPool(String),
}

impl MigrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::Source(SourceError::ProviderUnavailable { .. }) => ErrorKind::ProviderUnavailable,
            Self::Source(SourceError::RetrievalTimeout(_)) => ErrorKind::RetrievalTimeout,
            Self::Source(SourceError::RetrievalFailed(_)) => ErrorKind::RetrievalFailed,
            Self::StorageInit(_) => ErrorKind::StorageInitFailed,
            Self::StorageCommit(_) => ErrorKind::StorageCommitFailed,
            Self::ConversionFailed(_) => ErrorKind::ConversionFailed,
            Self::WorkerPool(_) => ErrorKind::WorkerPoolFailed,
        }
    }
}

impl From<PoolError> for MigrationError {
    fn from(e: PoolError) -> Self {
        Self::WorkerPool(e.to_string())
    }
}

/// First few failure descriptions, for one-line reports.
fn summarize(failures: &[String]) -> String {
    const SHOWN: usize = 3;
    let mut summary = failures
        .iter()
        .take(SHOWN)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("; ");
    if failures.len() > SHOWN {
        summary.push_str(&format!("; and {} more", failures.len() - SHOWN));
    }
    summary
}
