//! Completion - mark_done の結果
//!
//! 重複完了は「失敗」ではないので、エラー型には入れずに明示的な結果型で返す。

use serde::{Deserialize, Serialize};

/// Result of reporting a task as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// Leased -> Done.
    Accepted,

    /// The task was already Done; the output reference was overwritten.
    AlreadyDone,

    /// The task is Pending (its lease expired and was reclaimed). Store unchanged.
    NotLeased,

    /// No task with this id. Store unchanged.
    NotFound,
}

impl Completion {
    /// Did the store record the task as Done?
    pub fn is_committed(self) -> bool {
        matches!(self, Completion::Accepted | Completion::AlreadyDone)
    }
}
