//! Bounded worker pool draining a [`JobQueue`].
//!
//! All workers are spawned before any of them is joined, so they run
//! concurrently; [`WorkerPool::run`] returns only after every worker thread
//! has exited. A worker exits as soon as it finds the queue empty.

use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use thiserror::Error;
use tracing::Span;

use crate::queue::JobQueue;

/// Error type for worker pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Failed to spawn any worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// A job that did not produce a result.
#[derive(Debug)]
pub enum JobFailure<E> {
    /// The processing function returned an error.
    Failed(E),
    /// The processing function panicked; the payload message is kept.
    Panicked(String),
}

/// Merged results of a pool run.
#[derive(Debug)]
pub struct PoolOutcome<R, E> {
    /// Results of jobs that processed successfully, in completion order per worker.
    pub completed: Vec<R>,
    /// Jobs that failed, one entry per job.
    pub failed: Vec<JobFailure<E>>,
    /// Number of worker threads that actually ran.
    pub workers_used: usize,
}

impl<R, E> PoolOutcome<R, E> {
    fn empty() -> Self {
        Self {
            completed: Vec::new(),
            failed: Vec::new(),
            workers_used: 0,
        }
    }

    /// Total number of jobs handled, successful or not.
    pub fn processed(&self) -> usize {
        self.completed.len() + self.failed.len()
    }
}

/// Fixed-size set of worker threads.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: NonZeroUsize,
    name: String,
}

impl WorkerPool {
    /// Create a pool that runs at most `workers` threads at once.
    pub fn new(workers: NonZeroUsize) -> Self {
        Self {
            workers,
            name: "worker".into(),
        }
    }

    /// Set the thread name prefix (threads are named `<name>-<index>`).
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Upper bound on concurrent workers.
    pub fn workers(&self) -> usize {
        self.workers.get()
    }

    /// Drain `jobs` with up to [`workers`](Self::workers) threads, applying
    /// `process` to every job.
    ///
    /// Only `min(workers, jobs.len())` threads are started. Each worker runs
    /// inside a child span of `parent`. A failing or panicking job is recorded
    /// in the outcome and the worker moves on to the next job.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Spawn`] if not a single worker thread could be
    /// started. If only some spawns fail, the started workers drain the queue.
    pub fn run<T, C, R, E, F>(
        &self,
        jobs: &JobQueue<T>,
        context: &C,
        parent: &Span,
        process: F,
    ) -> Result<PoolOutcome<R, E>, PoolError>
    where
        T: Send,
        C: Sync,
        R: Send,
        E: Send,
        F: Fn(T, &C) -> Result<R, E> + Sync,
    {
        let wanted = self.workers.get().min(jobs.len());
        if wanted == 0 {
            return Ok(PoolOutcome::empty());
        }

        let process = &process;
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(wanted);
            let mut spawn_error = None;

            for index in 0..wanted {
                let span = tracing::debug_span!(parent: parent, "worker", index);
                let spawned = thread::Builder::new()
                    .name(format!("{}-{index}", self.name))
                    .spawn_scoped(scope, move || {
                        let _entered = span.enter();
                        drain(jobs, context, process)
                    });

                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        tracing::warn!(index, error = %e, "Failed to spawn worker thread");
                        spawn_error = Some(e);
                    }
                }
            }

            if handles.is_empty() {
                if let Some(e) = spawn_error {
                    return Err(PoolError::Spawn(e));
                }
            }

            let mut outcome = PoolOutcome::empty();
            outcome.workers_used = handles.len();

            // Join barrier: every started worker, not just an empty queue.
            for handle in handles {
                match handle.join() {
                    Ok(mut report) => {
                        outcome.completed.append(&mut report.completed);
                        outcome.failed.append(&mut report.failed);
                    }
                    Err(payload) => {
                        outcome
                            .failed
                            .push(JobFailure::Panicked(panic_message(payload.as_ref())));
                    }
                }
            }

            tracing::debug!(
                workers = outcome.workers_used,
                completed = outcome.completed.len(),
                failed = outcome.failed.len(),
                "Worker pool finished"
            );
            Ok(outcome)
        })
    }
}

/// Per-worker results handed back through the join handle.
struct WorkerReport<R, E> {
    completed: Vec<R>,
    failed: Vec<JobFailure<E>>,
}

fn drain<T, C, R, E, F>(jobs: &JobQueue<T>, context: &C, process: &F) -> WorkerReport<R, E>
where
    F: Fn(T, &C) -> Result<R, E>,
{
    let mut report = WorkerReport {
        completed: Vec::new(),
        failed: Vec::new(),
    };

    while let Some(job) = jobs.try_dequeue() {
        match panic::catch_unwind(AssertUnwindSafe(|| process(job, context))) {
            Ok(Ok(result)) => report.completed.push(result),
            Ok(Err(e)) => report.failed.push(JobFailure::Failed(e)),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(panic = %message, "Job panicked");
                report.failed.push(JobFailure::Panicked(message));
            }
        }
    }

    tracing::trace!(
        completed = report.completed.len(),
        failed = report.failed.len(),
        "Queue drained, worker exiting"
    );
    report
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".into()
    }
}
