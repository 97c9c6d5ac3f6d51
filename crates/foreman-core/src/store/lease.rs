//! LeaseMonitor - リース期限切れの回収
//!
//! Pending -> Leased になるたびに一発タイマーを仕掛ける。
//! 発火したら Store のロックを取り、まだ同じ世代で Leased なら Pending に戻す。
//!
//! # 世代番号
//! タイマーは (task_id, lease_generation) を持つ。古いリースのタイマーが、
//! その後に別ワーカーへ貸し直されたタスクを誤って回収しないため。
//!
//! # キャンセル
//! 完了時にタイマーは止めない。Done のタスクに対する発火は何もしない。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::state::StoreState;
use crate::domain::TaskId;

/// Arms one reclaim timer per lease.
#[derive(Debug, Clone)]
pub struct LeaseMonitor {
    duration: Duration,
}

impl LeaseMonitor {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Schedule reclaim of `id` one lease duration from now.
    ///
    /// The deadline is fixed at the call, not when the timer task first runs.
    /// Must be called from inside a tokio runtime.
    pub(crate) fn arm(
        &self,
        state: Arc<Mutex<StoreState>>,
        id: TaskId,
        generation: u64,
    ) -> JoinHandle<()> {
        let duration = self.duration;
        let deadline = Instant::now() + duration;
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;

            let reclaimed = state.lock().await.reclaim(id, generation);
            if reclaimed {
                tracing::info!(task_id = %id, generation, ?duration, "lease expired, task reclaimed");
            } else {
                tracing::trace!(task_id = %id, generation, "lease timer fired on finished or re-leased task");
            }
        })
    }
}
