//! Migration orchestration.
//!
//! A run goes: make sure the schema exists, fetch the batch from the
//! provider, queue every record, let the worker pool convert and stage them
//! into one shared session, then commit that session once after all workers
//! have been joined.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{Instrument, Span};

use crate::error::MigrationError;
use crate::pool::{JobFailure, WorkerPool};
use crate::queue::JobQueue;
use crate::source::{MessageBox, Record, RecordSource};
use crate::storage::{ConversionError, InsertMode, Session, StagedRow, Store};

/// Records requested when no limit is given.
pub const DEFAULT_LIMIT: u32 = 5000;
/// Worker threads used when no count is given.
pub const DEFAULT_WORKERS: usize = 75;

/// What to do when some records fail to convert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Commit the rows that converted and report the failures.
    #[default]
    Collect,
    /// Write nothing if any record failed.
    FailFast,
}

/// Parameters of one migration run.
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub limit: u32,
    pub mbox: MessageBox,
    pub workers: NonZeroUsize,
    pub insert_mode: InsertMode,
    pub failure_policy: FailurePolicy,
}

impl MigrationOptions {
    /// Set the worker count, rejecting zero.
    pub fn with_workers(mut self, workers: usize) -> Result<Self, MigrationError> {
        self.workers = NonZeroUsize::new(workers).ok_or_else(|| {
            MigrationError::InvalidParameter("worker count must be at least 1".into())
        })?;
        Ok(self)
    }
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            mbox: MessageBox::All,
            workers: NonZeroUsize::new(DEFAULT_WORKERS).unwrap_or(NonZeroUsize::MIN),
            insert_mode: InsertMode::Insert,
            failure_policy: FailurePolicy::Collect,
        }
    }
}

/// A record that was not written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Sequence id, when the failure could be attributed to a record.
    pub id: Option<u64>,
    pub reason: String,
}

impl From<JobFailure<ConversionError>> for ItemFailure {
    fn from(failure: JobFailure<ConversionError>) -> Self {
        match failure {
            JobFailure::Failed(e) => Self {
                id: Some(e.id),
                reason: e.reason,
            },
            JobFailure::Panicked(message) => Self {
                id: None,
                reason: format!("worker panicked: {message}"),
            },
        }
    }
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "record {id}: {}", self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

/// Summary of a finished migration.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub database: PathBuf,
    /// Records returned by the source.
    pub fetched: usize,
    /// Rows written by the commit.
    pub committed: usize,
    /// Records that were not written.
    pub failures: Vec<ItemFailure>,
    pub workers_used: usize,
    pub elapsed: Duration,
}

impl MigrationReport {
    /// True when every fetched record was written.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.committed == self.fetched
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Migrated {} of {} message(s) into {} using {} worker(s) in {:.2}s",
            self.committed,
            self.fetched,
            self.database.display(),
            self.workers_used,
            self.elapsed.as_secs_f64()
        )?;
        if !self.failures.is_empty() {
            write!(f, "; {} failed:", self.failures.len())?;
            for failure in &self.failures {
                write!(f, "\n  - {failure}")?;
            }
        }
        Ok(())
    }
}

/// Moves records from a source into a store.
pub struct Migrator<S> {
    store: Store,
    source: S,
}

impl<S: RecordSource> Migrator<S> {
    pub fn new(store: Store, source: S) -> Self {
        Self { store, source }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Run one migration.
    ///
    /// Source errors abort before anything is queued. A commit error rolls
    /// back the whole batch. Conversion failures follow
    /// [`MigrationOptions::failure_policy`].
    ///
    /// SQLite work runs on the blocking pool. Once the batch has been fetched,
    /// staging and commit run to completion even if this future is dropped.
    pub async fn migrate(
        &self,
        options: &MigrationOptions,
    ) -> Result<MigrationReport, MigrationError> {
        let started = Instant::now();
        let span = tracing::info_span!(
            "migration",
            limit = options.limit,
            mbox = %options.mbox,
            workers = options.workers.get(),
        );

        let store = self.store.clone();
        let schema_span = span.clone();
        tokio::task::spawn_blocking(move || schema_span.in_scope(|| store.ensure_schema()))
            .await
            .map_err(|e| MigrationError::WorkerPool(format!("schema task failed: {e}")))?
            .map_err(MigrationError::StorageInit)?;

        let records = self
            .source
            .fetch(options.limit, options.mbox)
            .instrument(span.clone())
            .await?;

        let mut report = MigrationReport {
            database: self.store.path().to_path_buf(),
            fetched: records.len(),
            committed: 0,
            failures: Vec::new(),
            workers_used: 0,
            elapsed: Duration::ZERO,
        };

        if records.is_empty() {
            span.in_scope(|| tracing::info!("No text messages to migrate"));
            report.elapsed = started.elapsed();
            return Ok(report);
        }

        let store = self.store.clone();
        let options = options.clone();
        let staged = tokio::task::spawn_blocking(move || {
            stage_and_commit(&store, records, &options, &span)
        })
        .await
        .map_err(|e| MigrationError::WorkerPool(format!("migration task failed: {e}")))??;

        report.committed = staged.committed;
        report.failures = staged.failures;
        report.workers_used = staged.workers_used;
        report.elapsed = started.elapsed();
        Ok(report)
    }
}

struct Staged {
    committed: usize,
    failures: Vec<ItemFailure>,
    workers_used: usize,
}

/// Fan the records out to the pool, then commit from this thread.
fn stage_and_commit(
    store: &Store,
    records: Vec<Record>,
    options: &MigrationOptions,
    span: &Span,
) -> Result<Staged, MigrationError> {
    let _entered = span.enter();

    let queue: JobQueue<Record> = records.into_iter().collect();
    let session = store.session(options.insert_mode);
    let pool = WorkerPool::new(options.workers).with_name("sqlsms-worker");

    let outcome = pool.run(&queue, &session, span, stage_record)?;
    let failures: Vec<ItemFailure> = outcome.failed.into_iter().map(Into::into).collect();
    for failure in &failures {
        tracing::warn!(record_id = ?failure.id, reason = %failure.reason, "Message not staged");
    }

    if !failures.is_empty() && options.failure_policy == FailurePolicy::FailFast {
        let dropped = session.rollback();
        tracing::error!(
            failed = failures.len(),
            dropped,
            "Aborting migration, no messages written"
        );
        return Err(MigrationError::ConversionFailed(
            failures.iter().map(ToString::to_string).collect(),
        ));
    }

    let commit_started = Instant::now();
    let committed = session.commit().map_err(MigrationError::StorageCommit)?;
    tracing::info!(
        rows = committed,
        failed = failures.len(),
        elapsed_ms = commit_started.elapsed().as_millis() as u64,
        "Committed text messages"
    );

    Ok(Staged {
        committed,
        failures,
        workers_used: outcome.workers_used,
    })
}

fn stage_record(record: Record, session: &Session) -> Result<(), ConversionError> {
    let id = record.id;
    let row = StagedRow::try_from(record)?;
    session.append(row);
    tracing::trace!(record_id = id, "Staged message");
    Ok(())
}
