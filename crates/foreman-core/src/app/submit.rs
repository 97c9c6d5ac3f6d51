//! Submitter - 入力を登録し、結果を取り出す側の窓口
//!
//! # 設計原則
//! - 入力は先に ContentStore に置き、その参照で Task を作る
//! - 結果は Done になったタスクの output_ref から読む
//! - Store と ContentStore の間に取引（トランザクション）は無い。put 成功後に
//!   create されなければ孤児 blob が残るだけ

use std::sync::Arc;

use thiserror::Error;

use crate::domain::{ErrorKind, TaskId, TaskState};
use crate::ports::{ContentError, ContentStore};
use crate::store::TaskStore;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),

    #[error(transparent)]
    Content(#[from] ContentError),
}

impl SubmitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubmitError::UnknownTask(_) => ErrorKind::Invariant,
            SubmitError::Content(e) => e.kind(),
        }
    }
}

/// What a task has produced so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutput {
    /// Still Pending or Leased.
    NotReady,
    /// Done, but the worker reported no output.
    Empty,
    Ready(Vec<u8>),
}

#[derive(Clone)]
pub struct Submitter {
    store: Arc<TaskStore>,
    content: Arc<dyn ContentStore>,
}

impl Submitter {
    pub fn new(store: Arc<TaskStore>, content: Arc<dyn ContentStore>) -> Self {
        Self { store, content }
    }

    /// Store `input` and create a Pending task for it.
    pub async fn submit(&self, input: Vec<u8>) -> Result<TaskId, ContentError> {
        let input_ref = self.content.put(input).await?;
        let id = self.store.create(input_ref.clone()).await;
        tracing::info!(task_id = %id, input_ref = %input_ref, "task submitted");
        Ok(id)
    }

    pub async fn submit_all<I>(&self, inputs: I) -> Result<Vec<TaskId>, ContentError>
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        let mut ids = Vec::new();
        for input in inputs {
            ids.push(self.submit(input).await?);
        }
        Ok(ids)
    }

    pub async fn result(&self, id: TaskId) -> Result<TaskOutput, SubmitError> {
        let task = self
            .store
            .get(id)
            .await
            .ok_or(SubmitError::UnknownTask(id))?;

        if task.state() != TaskState::Done {
            return Ok(TaskOutput::NotReady);
        }
        match task.output_ref() {
            Some(output_ref) => Ok(TaskOutput::Ready(self.content.get(output_ref).await?)),
            None => Ok(TaskOutput::Empty),
        }
    }
}
