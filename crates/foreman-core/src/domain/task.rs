//! Task record: state + content references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ContentRef, TaskId, TaskState};

/// One unit of work held by the Task Store.
///
/// Design:
/// - The Task Store owns every record; callers only ever see clones.
/// - Transition methods are crate-private so state changes stay inside the store.
/// - `lease_generation` identifies one particular lease, so a stale expiry timer
///   can tell that the task has been re-leased since it was armed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    state: TaskState,
    input_ref: ContentRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_ref: Option<ContentRef>,

    /// Number of times this task has been leased.
    #[serde(default)]
    lease_generation: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    leased_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: TaskId, input_ref: ContentRef) -> Self {
        Self {
            id,
            state: TaskState::Pending,
            input_ref,
            output_ref: None,
            lease_generation: 0,
            leased_at: None,
            completed_at: None,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn input_ref(&self) -> &ContentRef {
        &self.input_ref
    }

    /// Empty until the task is Done (and may stay empty when a worker
    /// reports completion without output).
    pub fn output_ref(&self) -> Option<&ContentRef> {
        self.output_ref.as_ref()
    }

    pub fn lease_generation(&self) -> u64 {
        self.lease_generation
    }

    pub fn leased_at(&self) -> Option<DateTime<Utc>> {
        self.leased_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Pending -> Leased. Returns the new lease generation.
    pub(crate) fn start_lease(&mut self, now: DateTime<Utc>) -> u64 {
        self.state = TaskState::Leased;
        self.lease_generation += 1;
        self.leased_at = Some(now);
        self.lease_generation
    }

    /// Leased -> Pending (lease expired).
    pub(crate) fn reclaim(&mut self) {
        self.state = TaskState::Pending;
        self.leased_at = None;
    }

    /// Leased/Done -> Done. Last write wins for the output reference.
    pub(crate) fn complete(&mut self, output_ref: Option<ContentRef>, now: DateTime<Utc>) {
        self.state = TaskState::Done;
        self.output_ref = output_ref;
        self.completed_at = Some(now);
    }
}
