//! LocalDispatcher - 同一プロセス内の TaskStore を直接呼ぶ Dispatcher

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Completion, ContentRef, Task, TaskId};
use crate::ports::{DispatchError, Dispatcher};
use crate::store::TaskStore;

pub struct LocalDispatcher {
    store: Arc<TaskStore>,
}

impl LocalDispatcher {
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Dispatcher for LocalDispatcher {
    async fn lease_next(&self) -> Result<Option<Task>, DispatchError> {
        Ok(self.store.lease_next().await)
    }

    async fn task_finished(
        &self,
        id: TaskId,
        output_ref: Option<ContentRef>,
    ) -> Result<Completion, DispatchError> {
        Ok(self.store.mark_done(id, output_ref).await)
    }
}
