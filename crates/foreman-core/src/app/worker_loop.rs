//! WorkerLoop - タスク実行ループ
//!
//! # フロー
//! 1. Dispatcher::lease_next() でタスクを借りる
//! 2. ContentStore::get() で入力を取る
//! 3. Transform::apply() で処理する
//! 4. ContentStore::put() で出力を置く（新しい参照が返る）
//! 5. Dispatcher::task_finished() で完了を報告する
//!
//! どこで失敗しても固定 backoff の後に 1 からやり直す。リースを自分から手放すことは
//! しない。回収は LeaseMonitor の期限切れだけに任せる。
//!
//! # 学習ポイント
//! - 明示的な状態機械（`step` で 1 遷移ずつ進められる）
//! - リモート呼び出しはすべて `tokio::time::timeout` で上限を切る
//! - backoff は `tokio::time::sleep` なので、テストは paused time で決定的に回せる

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use crate::domain::{Completion, ContentRef, ErrorKind, Task, TaskId};
use crate::ports::{
    ContentError, ContentStore, DispatchError, Dispatcher, Transform, TransformError,
};

/// What to do when the transform fails on an input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformFailurePolicy {
    /// Report the task as finished with no output, so a permanently bad input
    /// is not retried forever.
    #[default]
    ReportEmpty,

    /// Back off and leave the task Leased; it comes back after lease expiry.
    AwaitReclaim,
}

/// Timing and policy knobs for one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSettings {
    /// Sleep after any failure branch before asking for the next task.
    pub backoff: Duration,

    /// Upper bound on each remote call.
    pub call_timeout: Duration,

    pub transform_failure: TransformFailurePolicy,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(2),
            call_timeout: Duration::from_secs(5),
            transform_failure: TransformFailurePolicy::ReportEmpty,
        }
    }
}

/// The four suspension points of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCall {
    LeaseNext,
    FetchInput,
    StoreOutput,
    ReportDone,
}

impl fmt::Display for RemoteCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemoteCall::LeaseNext => "lease_next",
            RemoteCall::FetchInput => "fetch_input",
            RemoteCall::StoreOutput => "store_output",
            RemoteCall::ReportDone => "report_done",
        };
        f.write_str(s)
    }
}

/// Why a worker went into backoff.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{0} timed out after {1:?}")]
    Timeout(RemoteCall, Duration),

    #[error("no task available")]
    NoTask,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("completion of {id} was not recorded ({completion:?})")]
    NotCommitted { id: TaskId, completion: Completion },
}

impl WorkerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::Timeout(..) | WorkerError::NoTask | WorkerError::Transform(_) => {
                ErrorKind::Transient
            }
            WorkerError::Dispatch(e) => e.kind(),
            WorkerError::Content(e) => e.kind(),
            WorkerError::NotCommitted { .. } => ErrorKind::Invariant,
        }
    }
}

/// Worker state machine.
///
/// Idle -> RequestingTask -> FetchingInput -> Processing -> StoringOutput
///      -> ReportingDone -> Idle
///
/// Every failure goes to Backoff, and Backoff goes to Idle.
#[derive(Debug)]
pub enum WorkerState {
    Idle,
    RequestingTask,
    FetchingInput { task: Task },
    Processing { task: Task, input: Vec<u8> },
    StoringOutput { task: Task, output: Vec<u8> },
    ReportingDone { task: Task, output_ref: Option<ContentRef> },
    Backoff { error: WorkerError },
}

impl WorkerState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkerState::Idle => "idle",
            WorkerState::RequestingTask => "requesting_task",
            WorkerState::FetchingInput { .. } => "fetching_input",
            WorkerState::Processing { .. } => "processing",
            WorkerState::StoringOutput { .. } => "storing_output",
            WorkerState::ReportingDone { .. } => "reporting_done",
            WorkerState::Backoff { .. } => "backoff",
        }
    }
}

/// Collaborators shared by every worker of a pool.
#[derive(Clone)]
pub struct WorkerDeps {
    pub dispatcher: Arc<dyn Dispatcher>,
    pub content: Arc<dyn ContentStore>,
    pub transform: Arc<dyn Transform>,
}

pub struct WorkerLoop {
    worker_id: usize,
    deps: WorkerDeps,
    settings: WorkerSettings,
}

impl WorkerLoop {
    pub fn new(worker_id: usize, deps: WorkerDeps, settings: WorkerSettings) -> Self {
        Self {
            worker_id,
            deps,
            settings,
        }
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Loop until process termination.
    pub async fn run_forever(&self) {
        let mut state = WorkerState::Idle;
        loop {
            state = self.step(state).await;
        }
    }

    /// Loop until `shutdown` reads `true`. Checked only in Idle, so an in-flight
    /// task (or backoff) finishes first.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        let mut state = WorkerState::Idle;
        loop {
            let stopping = matches!(state, WorkerState::Idle) && *shutdown.borrow();
            if stopping {
                tracing::debug!(worker_id = self.worker_id, "worker stopping");
                break;
            }
            state = self.step(state).await;
        }
    }

    /// Perform exactly one transition.
    pub async fn step(&self, state: WorkerState) -> WorkerState {
        match state {
            WorkerState::Idle => WorkerState::RequestingTask,

            WorkerState::RequestingTask => {
                let leased = self
                    .bounded(RemoteCall::LeaseNext, self.deps.dispatcher.lease_next())
                    .await;
                match leased {
                    Ok(Some(task)) => {
                        tracing::debug!(
                            worker_id = self.worker_id,
                            task_id = %task.id(),
                            input_ref = %task.input_ref(),
                            "task assigned"
                        );
                        WorkerState::FetchingInput { task }
                    }
                    Ok(None) => WorkerState::Backoff {
                        error: WorkerError::NoTask,
                    },
                    Err(error) => WorkerState::Backoff { error },
                }
            }

            WorkerState::FetchingInput { task } => {
                let fetched = self
                    .bounded(RemoteCall::FetchInput, self.deps.content.get(task.input_ref()))
                    .await;
                match fetched {
                    Ok(input) => WorkerState::Processing { task, input },
                    // リースは手放さない。期限切れで回収される
                    Err(error) => WorkerState::Backoff { error },
                }
            }

            WorkerState::Processing { task, input } => match self.deps.transform.apply(&input) {
                Ok(output) => WorkerState::StoringOutput { task, output },
                Err(e) => match self.settings.transform_failure {
                    TransformFailurePolicy::ReportEmpty => {
                        tracing::warn!(
                            worker_id = self.worker_id,
                            task_id = %task.id(),
                            transform = self.deps.transform.name(),
                            error = %e,
                            "transform failed, reporting task finished without output"
                        );
                        WorkerState::ReportingDone {
                            task,
                            output_ref: None,
                        }
                    }
                    TransformFailurePolicy::AwaitReclaim => WorkerState::Backoff { error: e.into() },
                },
            },

            WorkerState::StoringOutput { task, output } => {
                let stored = self
                    .bounded(RemoteCall::StoreOutput, self.deps.content.put(output))
                    .await;
                match stored {
                    Ok(output_ref) => WorkerState::ReportingDone {
                        task,
                        output_ref: Some(output_ref),
                    },
                    Err(error) => WorkerState::Backoff { error },
                }
            }

            WorkerState::ReportingDone { task, output_ref } => {
                let id = task.id();
                let reported = self
                    .bounded(
                        RemoteCall::ReportDone,
                        self.deps.dispatcher.task_finished(id, output_ref.clone()),
                    )
                    .await;
                match reported {
                    Ok(completion) if completion.is_committed() => {
                        tracing::info!(
                            worker_id = self.worker_id,
                            task_id = %id,
                            output_ref = output_ref.as_ref().map(ContentRef::as_str),
                            ?completion,
                            "task finished"
                        );
                        WorkerState::Idle
                    }
                    Ok(completion) => WorkerState::Backoff {
                        error: WorkerError::NotCommitted { id, completion },
                    },
                    // 出力は保存済みだが未確定。期限切れ後に誰かがやり直すかもしれない
                    Err(error) => WorkerState::Backoff { error },
                }
            }

            WorkerState::Backoff { error } => {
                match &error {
                    WorkerError::NoTask => {
                        tracing::debug!(worker_id = self.worker_id, "no task, backing off")
                    }
                    other => tracing::warn!(
                        worker_id = self.worker_id,
                        kind = ?other.kind(),
                        error = %other,
                        backoff = ?self.settings.backoff,
                        "backing off"
                    ),
                }
                tokio::time::sleep(self.settings.backoff).await;
                WorkerState::Idle
            }
        }
    }

    async fn bounded<T, E>(
        &self,
        call: RemoteCall,
        fut: impl Future<Output = Result<T, E>>,
    ) -> Result<T, WorkerError>
    where
        WorkerError: From<E>,
    {
        match tokio::time::timeout(self.settings.call_timeout, fut).await {
            Ok(result) => result.map_err(WorkerError::from),
            Err(_) => Err(WorkerError::Timeout(call, self.settings.call_timeout)),
        }
    }
}
