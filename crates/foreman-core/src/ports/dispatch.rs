//! Dispatcher port - ワーカーから見た Task Store への入口
//!
//! 実際の転送路（pub/sub、HTTP など）は実装側の関心事。
//! ワーカーは「次のタスクをくれ」「終わった」の 2 つだけを知っていればよい。
//!
//! # 実装
//! - **LocalDispatcher**: 同一プロセスの TaskStore を直接呼ぶ
//! - **ChannelDispatcher**: JSON フレームを channel で request/reply する

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Completion, ContentRef, ErrorKind, Task, TaskId};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatcher disconnected")]
    Disconnected,

    #[error("malformed frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unexpected response to {request}: {response}")]
    UnexpectedResponse {
        request: &'static str,
        response: String,
    },

    #[error("dispatcher rejected request: {0}")]
    Remote(String),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Disconnected | DispatchError::Remote(_) => ErrorKind::Transient,
            DispatchError::Decode(_) | DispatchError::UnexpectedResponse { .. } => {
                ErrorKind::Decode
            }
        }
    }
}

/// Dispatcher は lease_next / task_finished の 2 操作だけを公開する
///
/// # 設計原則
/// - ステートレスなアダプタ（状態は TaskStore にしかない）
/// - 「タスクなし」はエラーではなく `Ok(None)`
/// - タイムアウトは呼び出し側（WorkerLoop）が掛ける
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn lease_next(&self) -> Result<Option<Task>, DispatchError>;

    async fn task_finished(
        &self,
        id: TaskId,
        output_ref: Option<ContentRef>,
    ) -> Result<Completion, DispatchError>;
}
