//! TaskCounts - Task Store の集計ビュー

use serde::{Deserialize, Serialize};

/// Number of tasks per state, taken under the store lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub pending: usize,
    pub leased: usize,
    pub done: usize,
}

impl TaskCounts {
    pub fn total(&self) -> usize {
        self.pending + self.leased + self.done
    }

    /// True when every task is Done (and there is at least one).
    pub fn all_done(&self) -> bool {
        self.done > 0 && self.done == self.total()
    }
}
