//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryContentStore**: 開発用の blob ストア
//! - **LocalDispatcher**: 同一プロセスの TaskStore を直接呼ぶ
//! - **ChannelDispatcher / DispatcherServer**: JSON フレームの request/reply
//! - **InMemoryDiscovery**: 名前 -> アドレスの登録簿
//! - **WordCount / ChannelSwap**: 参照用の Transform

pub mod channel_dispatch;
pub mod inmem_content;
pub mod inmem_discovery;
pub mod local_dispatch;
pub mod protocol;
pub mod transforms;

// 主要な型を再エクスポート
pub use self::channel_dispatch::{ChannelDispatcher, DispatcherServer};
pub use self::inmem_content::InMemoryContentStore;
pub use self::inmem_discovery::InMemoryDiscovery;
pub use self::local_dispatch::LocalDispatcher;
pub use self::transforms::{ChannelSwap, WordCount};
