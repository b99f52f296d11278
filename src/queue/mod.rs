//! Drain-once FIFO job queue.
//!
//! The queue is filled before the worker pool starts and drained by the
//! workers. Dequeueing never waits for a producer: an empty queue means
//! the batch is exhausted and the polling worker exits.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Thread-safe FIFO queue of pending jobs.
///
/// Every item is handed out to exactly one caller of [`JobQueue::try_dequeue`].
#[derive(Debug)]
pub struct JobQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> JobQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    /// Add a job to the back of the queue.
    pub fn enqueue(&self, item: T) {
        self.lock().push_back(item);
    }

    /// Remove and return the job at the front, or `None` if the queue is
    /// empty at the time of the call.
    pub fn try_dequeue(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Number of jobs still queued.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the queue is drained.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Push and pop never leave the deque half-updated, so a poisoned lock
    // still guards a consistent queue.
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for JobQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: Mutex::new(iter.into_iter().collect()),
        }
    }
}

impl<T> Extend<T> for JobQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(iter);
    }
}
