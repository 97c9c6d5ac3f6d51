//! Dispatcher の wire 形式（JSON フレーム）
//!
//! ```text
//! {"op":"lease_next"}
//! {"op":"task_finished","id":0,"output_ref":"content-..."}
//!
//! {"status":"task","task":{...}}
//! {"status":"no_task"}
//! {"status":"finished","completion":"accepted"}
//! {"status":"error","message":"..."}
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::{Completion, ContentRef, Task, TaskId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DispatchRequest {
    LeaseNext,
    TaskFinished {
        id: TaskId,
        #[serde(default)]
        output_ref: Option<ContentRef>,
    },
}

impl DispatchRequest {
    pub fn name(&self) -> &'static str {
        match self {
            DispatchRequest::LeaseNext => "lease_next",
            DispatchRequest::TaskFinished { .. } => "task_finished",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchResponse {
    Task { task: Task },
    /// 「いま貸せるタスクは無い」。エラーではない
    NoTask,
    Finished { completion: Completion },
    Error { message: String },
}

impl DispatchResponse {
    pub fn name(&self) -> &'static str {
        match self {
            DispatchResponse::Task { .. } => "task",
            DispatchResponse::NoTask => "no_task",
            DispatchResponse::Finished { .. } => "finished",
            DispatchResponse::Error { .. } => "error",
        }
    }
}

pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(msg)
}

pub fn decode<'a, T: Deserialize<'a>>(frame: &'a [u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(frame)
}
