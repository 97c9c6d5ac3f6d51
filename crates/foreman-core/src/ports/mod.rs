//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait はエンジンの外側（転送路、blob ストレージ、サービス探索、
//! ドメイン固有の処理）へのインターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - Task Store が唯一の正本（source of truth）。ポートの先に状態は持たせない
//! - 転送路は「届かないかもしれない」。タイムアウトは「後でやり直す」の意味

pub mod clock;
pub mod content_store;
pub mod discovery;
pub mod dispatch;
pub mod id_generator;
pub mod transform;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::content_store::{ContentError, ContentStore};
pub use self::discovery::{Discovery, DiscoveryError, resolve_with_retry};
pub use self::dispatch::{DispatchError, Dispatcher};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::transform::{Transform, TransformError};
