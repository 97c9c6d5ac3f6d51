//! foreman-core
//!
//! Core building blocks for the Foreman task distribution engine.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, state, task, completion, counts, errors）
//! - **ports**: 抽象化レイヤー（Dispatcher, ContentStore, Transform, Discovery, Clock, IdGenerator）
//! - **store**: TaskStore と LeaseMonitor（唯一の状態の持ち主）
//! - **impls**: ports の実装（InMemoryContentStore, ChannelDispatcher など）
//! - **app**: アプリケーションロジック（config, worker_loop, pool, submit）
//!
//! # 保証
//! - ある時点で Leased なタスクを持っているワーカーは高々 1 つ
//! - Done は終端。期限切れの回収は Leased のタスクにしか効かない
//! - 実行は at-least-once。同じ入力が 2 回処理されることはある

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod store;
