//! Admission queue bounding how many tasks run at once
//!
//! The run-wide queue gates every fetch. Short-lived queues with the fixed
//! [`NESTED_CONCURRENCY`] bound gate pagination fan-out and the iterations of
//! composite operations that contain other composite operations, so deep
//! trees do not multiply their breadth at every level.

use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Bound used for pagination and for nested composite operations
pub const NESTED_CONCURRENCY: usize = 3;

/// A bounded worker pool with FIFO admission
///
/// Cloning a queue shares its slots.
#[derive(Debug, Clone)]
pub struct AdmissionQueue {
    /// Slots; tokio's semaphore hands permits out in request order
    semaphore: Arc<Semaphore>,

    concurrency: usize,
}

impl AdmissionQueue {
    /// Creates a queue admitting at most `concurrency` tasks (at least one)
    pub fn new(concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    /// Creates a queue with the fixed nested bound
    pub fn nested() -> Self {
        Self::new(NESTED_CONCURRENCY)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Number of free slots right now
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Runs `task` once a slot is free and returns its output
    ///
    /// The task is not polled before it holds a slot. Its outcome, including
    /// an `Err`, is handed back to the caller and never affects other tasks.
    pub async fn submit<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        match self.semaphore.acquire().await {
            Ok(_permit) => task.await,
            // The semaphore is owned here and never closed
            Err(_) => task.await,
        }
    }

    /// Runs one task per item through the queue, returning outputs in item order
    pub async fn map_ordered<I, F, Fut, T>(&self, items: I, mut f: F) -> Vec<T>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future<Output = T>,
    {
        join_all(items.into_iter().map(|item| self.submit(f(item)))).await
    }
}
