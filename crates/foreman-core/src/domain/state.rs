//! Task state machine.

use serde::{Deserialize, Serialize};

/// Task state.
///
/// State transitions:
/// - Pending -> Leased            (lease_next)
/// - Leased  -> Done              (mark_done)
/// - Leased  -> Pending           (lease expiry / reclaim)
/// - Done    -> Done              (duplicate mark_done, output overwritten)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting for a worker.
    Pending,

    /// Claimed by a worker under a time-bound lease.
    Leased,

    /// Finished. Terminal.
    Done,
}

impl TaskState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Done)
    }

    /// Is this task eligible for lease?
    pub fn is_leasable(self) -> bool {
        matches!(self, TaskState::Pending)
    }
}
