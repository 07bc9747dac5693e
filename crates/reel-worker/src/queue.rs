//! Bounded FIFO admission for composition jobs.
//!
//! At most `max_concurrent` jobs run at once. Further submitters wait on a fair
//! semaphore and are admitted in the order they called [`AdmissionQueue::submit`].
//! Admitted jobs are spawned with their permit, so a job runs to completion even
//! if its submitter stops waiting.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::metrics;

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("Admission queue is closed")]
    Closed,

    #[error("Job panicked: {0}")]
    JobPanicked(String),
}

/// Point-in-time queue occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub active: usize,
    pub waiting: usize,
    pub max_concurrent: usize,
}

#[derive(Debug, Default)]
struct Counters {
    active: AtomicUsize,
    waiting: AtomicUsize,
}

impl Counters {
    fn counter(&self, slot: Slot) -> &AtomicUsize {
        match slot {
            Slot::Active => &self.active,
            Slot::Waiting => &self.waiting,
        }
    }

    fn publish(&self) {
        metrics::set_queue_depth(
            self.active.load(Ordering::SeqCst),
            self.waiting.load(Ordering::SeqCst),
        );
    }
}

#[derive(Clone, Copy)]
enum Slot {
    Active,
    Waiting,
}

/// Holds one unit of a counter for as long as it lives.
struct SlotGuard {
    counters: Arc<Counters>,
    slot: Slot,
}

impl SlotGuard {
    fn take(counters: &Arc<Counters>, slot: Slot) -> Self {
        counters.counter(slot).fetch_add(1, Ordering::SeqCst);
        counters.publish();
        Self {
            counters: Arc::clone(counters),
            slot,
        }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.counters.counter(self.slot).fetch_sub(1, Ordering::SeqCst);
        self.counters.publish();
    }
}

/// Process-wide gate in front of the composition pipeline.
#[derive(Debug, Clone)]
pub struct AdmissionQueue {
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
    max_concurrent: usize,
}

impl AdmissionQueue {
    /// Create a queue admitting up to `max_concurrent` jobs (at least one).
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            counters: Arc::new(Counters::default()),
            max_concurrent,
        }
    }

    /// Wait for admission, run `job` and return exactly its output.
    pub async fn submit<F, R>(&self, job: F) -> Result<R, AdmissionError>
    where
        F: Future<Output = R> + Send + 'static,
        R: Send + 'static,
    {
        let waiting = SlotGuard::take(&self.counters, Slot::Waiting);
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AdmissionError::Closed)?;
        let active = SlotGuard::take(&self.counters, Slot::Active);
        drop(waiting);

        debug!(
            active = self.active(),
            max_concurrent = self.max_concurrent,
            "Job admitted"
        );

        let handle = tokio::spawn(async move {
            // Dropped in reverse order: the active count falls before the next job is admitted.
            let _permit = permit;
            let _active = active;
            job.await
        });

        handle.await.map_err(|e| {
            if e.is_panic() {
                let message = panic_message(e.into_panic());
                error!(panic = %message, "Admitted job panicked");
                AdmissionError::JobPanicked(message)
            } else {
                AdmissionError::Closed
            }
        })
    }

    /// Number of jobs currently running.
    pub fn active(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            active: self.active(),
            waiting: self.counters.waiting.load(Ordering::SeqCst),
            max_concurrent: self.max_concurrent,
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
