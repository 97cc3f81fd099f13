//! Bounded-concurrency task scheduler
//!
//! This module handles:
//! - FIFO admission of submitted tasks from a backlog
//! - Global concurrency limiting (at most `max_concurrent` tasks in flight)
//! - Converting task panics into values so a bad task never stalls admission
//!
//! The scheduler never judges task outcomes. It only learns that a slot is
//! free again and hands the finished task's key and output back to its owner.

use futures::FutureExt;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use tokio::task::JoinSet;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// A zero-argument unit of work, started lazily on admission
type Task<T> = Box<dyn FnOnce() -> BoxFuture<T> + Send + 'static>;

/// How a task finished
#[derive(Debug)]
pub enum TaskOutcome<T> {
    /// The task ran to completion; its output may itself be an error value
    Completed(T),
    /// The task panicked; the payload message is preserved
    Panicked(String),
}

/// Bounded FIFO task runner
///
/// Each task carries a key of type `K` that is returned alongside its outcome,
/// so the owner can always attribute a result (or a panic) to the request
/// that produced it.
pub struct Scheduler<K, T> {
    /// Maximum number of tasks executing at once
    max_concurrent: usize,

    /// Tasks waiting for a free slot, in submission order
    backlog: VecDeque<(K, Task<T>)>,

    /// Tasks currently executing
    in_flight: JoinSet<(K, TaskOutcome<T>)>,

    /// Total tasks admitted so far
    started: u64,
}

impl<K, T> Scheduler<K, T>
where
    K: Send + 'static,
    T: Send + 'static,
{
    /// Creates a new scheduler; a limit of zero is treated as one
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            backlog: VecDeque::new(),
            in_flight: JoinSet::new(),
            started: 0,
        }
    }

    /// Enqueues a task and admits as many backlog entries as slots allow
    ///
    /// The closure is not invoked until the task is admitted.
    pub fn submit<F, Fut>(&mut self, key: K, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.backlog
            .push_back((key, Box::new(move || Box::pin(task()) as BoxFuture<T>)));
        self.admit();
    }

    /// Starts backlog entries while there is a free slot
    ///
    /// Admission needs a tokio runtime to spawn onto; outside of one the
    /// backlog is left untouched until `next_completed` runs on a runtime.
    fn admit(&mut self) {
        if tokio::runtime::Handle::try_current().is_err() {
            return;
        }

        while self.in_flight.len() < self.max_concurrent {
            let Some((key, task)) = self.backlog.pop_front() else {
                break;
            };

            let fut = task();
            self.started += 1;
            tracing::trace!(
                "Admitted task #{} ({} in flight, {} waiting)",
                self.started,
                self.in_flight.len() + 1,
                self.backlog.len()
            );

            self.in_flight.spawn(async move {
                let outcome = match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(output) => TaskOutcome::Completed(output),
                    Err(payload) => TaskOutcome::Panicked(panic_message(payload.as_ref())),
                };
                (key, outcome)
            });
        }
    }

    /// Fills free slots, then waits for the next task to finish
    ///
    /// A slot freed by the returned task is refilled on the following call
    /// (or on the next `submit`), so the owner can react to the outcome,
    /// e.g. by clearing the backlog, before another task starts.
    ///
    /// # Returns
    ///
    /// * `Some((key, outcome))` - A task finished
    /// * `None` - Nothing is in flight and the backlog is empty
    pub async fn next_completed(&mut self) -> Option<(K, TaskOutcome<T>)> {
        loop {
            self.admit();

            match self.in_flight.join_next().await? {
                Ok(finished) => {
                    return Some(finished);
                }
                Err(err) => {
                    // Only reachable if the runtime cancelled the task
                    tracing::warn!("Scheduled task did not complete: {}", err);
                }
            }
        }
    }

    /// Drops every task that has not started yet
    pub fn clear_backlog(&mut self) -> usize {
        let dropped = self.backlog.len();
        self.backlog.clear();
        dropped
    }

    /// Waits for in-flight tasks to finish, discarding their outputs
    ///
    /// Started tasks are never cancelled; not-yet-started ones are dropped.
    pub async fn drain(&mut self) -> usize {
        self.clear_backlog();
        let mut finished = 0;
        while self.in_flight.join_next().await.is_some() {
            finished += 1;
        }
        finished
    }

    /// Number of tasks currently executing
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of tasks waiting for a slot
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Returns true when nothing is running or waiting
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty() && self.backlog.is_empty()
    }

    /// Total number of tasks admitted since creation
    pub fn started(&self) -> u64 {
        self.started
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

/// Extracts a printable message from a panic payload
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
