//! Dispatch Queue
//!
//! FIFO executor with a hard bound on concurrently running tasks. Every
//! payout submission goes through here so the vault's signing key and the
//! node endpoint never see more than `limit` parallel calls (default 1).
//!
//! There is no priority and no cancellation: a task, once started, runs to
//! completion, and callers cannot retract enqueued work. Retry policy
//! belongs to the caller; the queue delivers each task's own result back
//! through the future returned by [`DispatchQueue::submit`].

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tracing::debug;

use super::error::VaultError;

/// Result of one payout task: the vault-side transaction id on success
pub type TaskResult = Result<String, VaultError>;

struct QueuedTask {
    task: BoxFuture<'static, TaskResult>,
    done: oneshot::Sender<TaskResult>,
}

struct QueueState {
    waiting: VecDeque<QueuedTask>,
    running: usize,
}

struct Inner {
    limit: usize,
    state: Mutex<QueueState>,
}

/// Bounded-concurrency FIFO task executor
///
/// Cheap to clone; all clones share one queue.
#[derive(Clone)]
pub struct DispatchQueue {
    inner: Arc<Inner>,
}

impl DispatchQueue {
    /// `limit` is clamped to at least 1
    pub fn new(limit: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                limit: limit.max(1),
                state: Mutex::new(QueueState {
                    waiting: VecDeque::new(),
                    running: 0,
                }),
            }),
        }
    }

    /// Enqueue a task and return a future for its result.
    ///
    /// Tasks still waiting are started in submission order; tasks already
    /// started may complete in any order. Task errors are delivered to the
    /// submitter's future, never retried here.
    pub fn submit<F>(&self, task: F) -> impl Future<Output = TaskResult> + Send + 'static
    where
        F: Future<Output = TaskResult> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        {
            let mut state = self.inner.state.lock().unwrap();
            state.waiting.push_back(QueuedTask {
                task: Box::pin(task),
                done: done_tx,
            });
            debug!(
                waiting = state.waiting.len(),
                running = state.running,
                "Task enqueued"
            );
        }
        Inner::dispatch(&self.inner);

        async move { done_rx.await.unwrap_or(Err(VaultError::TaskDropped)) }
    }

    /// Tasks currently executing
    pub fn running(&self) -> usize {
        self.inner.state.lock().unwrap().running
    }

    /// Tasks enqueued but not yet started
    pub fn waiting(&self) -> usize {
        self.inner.state.lock().unwrap().waiting.len()
    }
}

impl Inner {
    /// Start queued tasks while capacity allows.
    ///
    /// Each completed task re-runs this check from its own tokio task, so a
    /// backlog drains iteratively instead of recursing.
    fn dispatch(inner: &Arc<Inner>) {
        loop {
            let queued = {
                let mut state = inner.state.lock().unwrap();
                if state.running >= inner.limit {
                    return;
                }
                match state.waiting.pop_front() {
                    Some(task) => {
                        state.running += 1;
                        task
                    }
                    None => return,
                }
            };

            let inner = Arc::clone(inner);
            tokio::spawn(async move {
                let result = queued.task.await;
                // Submitter may have dropped its future; the task still ran
                let _ = queued.done.send(result);

                inner.state.lock().unwrap().running -= 1;
                Inner::dispatch(&inner);
            });
        }
    }
}
