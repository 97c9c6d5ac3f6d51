//! Domain identifiers (strongly-typed IDs).
//!
//! - `TaskId`: Task Store 内の位置。0 始まり、作成順に密に割り当てる
//! - `ContentRef`: Content Store 上の blob を指す不透明な参照
//!
//! TaskId は ULID ではなく連番にしています。Task Store は「id == 作成順の位置」を
//! 不変条件として持ち、カーソルによる走査もこの位置を前提にしているためです。

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Identifier of a Task (its creation-order position in the Task Store).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Position of the task in the store's ordered list.
    pub fn from_index(index: usize) -> Self {
        Self(index as u64)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// `None` when the id cannot be addressed on this platform.
    pub fn index(&self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl From<u64> for TaskId {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Opaque reference to a blob held by a Content Store.
///
/// 中身の形式には意味を持たせない（比較と表示だけ）。
/// Store が発行する参照は `content-<ULID>` 形式になる。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRef(String);

impl ContentRef {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// ULID から新しい参照を作る（IdGenerator が使う）
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(format!("content-{ulid}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContentRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
