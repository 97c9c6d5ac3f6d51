//! ChannelDispatcher - request/reply 型の Dispatcher
//!
//! # 学習ポイント
//! - mpsc + oneshot による request/reply
//! - 転送路の上では全部ただの bytes（JSON フレーム）
//! - サーバ側は状態を持たない。TaskStore に転送するだけ
//!
//! pub/sub の「Work.TaskToDo に request して reply を待つ」形をプロセス内で再現したもの。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::protocol::{self, DispatchRequest, DispatchResponse};
use crate::domain::{Completion, ContentRef, Task, TaskId};
use crate::ports::{DispatchError, Dispatcher};
use crate::store::TaskStore;

/// One request frame plus the slot its reply goes into.
#[derive(Debug)]
pub struct Frame {
    pub body: Vec<u8>,
    pub reply: oneshot::Sender<Vec<u8>>,
}

/// Create a connected server/client pair.
pub fn channel(store: Arc<TaskStore>, capacity: usize) -> (DispatcherServer, ChannelDispatcher) {
    let (tx, rx) = mpsc::channel(capacity);
    (DispatcherServer { store, rx }, ChannelDispatcher { tx })
}

/// サーバ側: フレームを受け取り TaskStore に転送して返信する
pub struct DispatcherServer {
    store: Arc<TaskStore>,
    rx: mpsc::Receiver<Frame>,
}

impl DispatcherServer {
    /// Serve until every client handle is dropped.
    pub async fn serve(mut self) {
        while let Some(frame) = self.rx.recv().await {
            let reply = self.handle(&frame.body).await;
            // 呼び出し側がタイムアウトで諦めていれば届かない。それで構わない
            if frame.reply.send(reply).is_err() {
                tracing::debug!("requester went away before the reply was sent");
            }
        }
        tracing::info!("dispatcher server stopped: all clients dropped");
    }

    /// Decode one request frame and produce the encoded response.
    pub async fn handle(&self, body: &[u8]) -> Vec<u8> {
        let response = match protocol::decode::<DispatchRequest>(body) {
            Ok(DispatchRequest::LeaseNext) => match self.store.lease_next().await {
                Some(task) => DispatchResponse::Task { task },
                None => DispatchResponse::NoTask,
            },
            Ok(DispatchRequest::TaskFinished { id, output_ref }) => DispatchResponse::Finished {
                completion: self.store.mark_done(id, output_ref).await,
            },
            Err(e) => {
                tracing::warn!(error = %e, "malformed dispatch request");
                DispatchResponse::Error {
                    message: format!("malformed request: {e}"),
                }
            }
        };

        match protocol::encode(&response) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode dispatch response");
                br#"{"status":"error","message":"encode failed"}"#.to_vec()
            }
        }
    }
}

/// クライアント側（ワーカーが持つ）
#[derive(Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::Sender<Frame>,
}

impl ChannelDispatcher {
    async fn call(&self, request: &DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        let body = protocol::encode(request)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Frame {
                body,
                reply: reply_tx,
            })
            .await
            .map_err(|_| DispatchError::Disconnected)?;
        let frame = reply_rx.await.map_err(|_| DispatchError::Disconnected)?;

        match protocol::decode::<DispatchResponse>(&frame)? {
            DispatchResponse::Error { message } => Err(DispatchError::Remote(message)),
            response => Ok(response),
        }
    }
}

#[async_trait]
impl Dispatcher for ChannelDispatcher {
    async fn lease_next(&self) -> Result<Option<Task>, DispatchError> {
        let request = DispatchRequest::LeaseNext;
        match self.call(&request).await? {
            DispatchResponse::Task { task } => Ok(Some(task)),
            DispatchResponse::NoTask => Ok(None),
            other => Err(DispatchError::UnexpectedResponse {
                request: request.name(),
                response: other.name().to_string(),
            }),
        }
    }

    async fn task_finished(
        &self,
        id: TaskId,
        output_ref: Option<ContentRef>,
    ) -> Result<Completion, DispatchError> {
        let request = DispatchRequest::TaskFinished { id, output_ref };
        match self.call(&request).await? {
            DispatchResponse::Finished { completion } => Ok(completion),
            other => Err(DispatchError::UnexpectedResponse {
                request: request.name(),
                response: other.name().to_string(),
            }),
        }
    }
}
