//! App - アプリケーション層
//!
//! このモジュールは、ports と store を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **EngineConfig**: 起動時設定（既定値 / JSON / 環境変数）
//! - **WorkerLoop**: タスク実行ループ（lease→fetch→transform→store→report）
//! - **WorkerPool**: WorkerLoop を N 個起動し、まとめて止める
//! - **Submitter**: 入力の登録と結果の取り出し

pub mod config;
pub mod pool;
pub mod submit;
pub mod worker_loop;

// 主要な型を再エクスポート
pub use self::config::{ConfigError, EngineConfig};
pub use self::pool::WorkerPool;
pub use self::submit::{SubmitError, Submitter, TaskOutput};
pub use self::worker_loop::{
    RemoteCall, TransformFailurePolicy, WorkerDeps, WorkerError, WorkerLoop, WorkerSettings,
    WorkerState,
};
pub use crate::domain::TaskCounts;
