//! Task Store: ordered task records, the scan cursor, and lease expiry.

mod lease;
mod state;

pub use lease::LeaseMonitor;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use self::state::StoreState;
use crate::domain::{Completion, ContentRef, Task, TaskCounts, TaskId};
use crate::ports::{Clock, SystemClock};

/// The single owner of all task records.
///
/// Design intent:
/// - One exclusive lock covers the list size, every task's state, and the cursor.
///   Reads (`get`, `counts`, `len`, ...) take the same lock as mutations.
/// - The lock is only held for in-memory work, never across I/O or `.await` on
///   anything other than the lock itself.
/// - Callers get clones of `Task`; nothing outside the store mutates a record.
pub struct TaskStore {
    state: Arc<Mutex<StoreState>>,
    monitor: LeaseMonitor,
    clock: Arc<dyn Clock>,
}

impl TaskStore {
    pub fn new(lease_duration: Duration) -> Self {
        Self::with_clock(lease_duration, Arc::new(SystemClock))
    }

    pub fn with_clock(lease_duration: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::new())),
            monitor: LeaseMonitor::new(lease_duration),
            clock,
        }
    }

    pub fn lease_duration(&self) -> Duration {
        self.monitor.duration()
    }

    /// Append a new Pending task for `input_ref`.
    pub async fn create(&self, input_ref: ContentRef) -> TaskId {
        let id = self.state.lock().await.create(input_ref);
        tracing::debug!(task_id = %id, "task created");
        id
    }

    /// Lease the first Pending task at or after the cursor, arming its expiry timer.
    ///
    /// `None` means "no task available right now", not an error.
    pub async fn lease_next(&self) -> Option<Task> {
        let now = self.clock.now();
        let task = self.state.lock().await.lease_next(now)?;

        // タイマーは Store と同じロックを取るので、ここでロックを手放していてよい
        self.monitor
            .arm(Arc::clone(&self.state), task.id(), task.lease_generation());

        tracing::debug!(
            task_id = %task.id(),
            generation = task.lease_generation(),
            "task leased"
        );
        Some(task)
    }

    /// Record that `id` finished with `output_ref`.
    ///
    /// Duplicate completions are accepted (last write wins); unknown ids leave the
    /// store untouched.
    pub async fn mark_done(&self, id: TaskId, output_ref: Option<ContentRef>) -> Completion {
        let now = self.clock.now();
        let completion = self.state.lock().await.mark_done(id, output_ref, now);

        match completion {
            Completion::Accepted => tracing::debug!(task_id = %id, "task done"),
            Completion::AlreadyDone => {
                tracing::info!(task_id = %id, "duplicate completion, output overwritten")
            }
            Completion::NotLeased => {
                tracing::warn!(task_id = %id, "completion for a reclaimed task ignored")
            }
            Completion::NotFound => tracing::warn!(task_id = %id, "completion for unknown task"),
        }
        completion
    }

    pub async fn get(&self, id: TaskId) -> Option<Task> {
        self.state.lock().await.get(id).cloned()
    }

    pub async fn is_done(&self, id: TaskId) -> bool {
        self.state
            .lock()
            .await
            .get(id)
            .is_some_and(|t| t.state().is_terminal())
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn counts(&self) -> TaskCounts {
        self.state.lock().await.counts()
    }

    /// Copy of every task record, in id order.
    pub async fn snapshot(&self) -> Vec<Task> {
        self.state.lock().await.tasks().to_vec()
    }

    /// Current scan cursor (smallest index not yet known Done).
    pub async fn cursor(&self) -> usize {
        self.state.lock().await.cursor()
    }
}
