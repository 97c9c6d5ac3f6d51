//! IdGenerator port - Content 参照の生成
//!
//! Content Store は put のたびに新しい参照を発行する（入力の参照を使い回さない）。
//! 分散環境でも調整なしに一意な参照を作れるよう ULID を使う。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ContentRef;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は一意な ContentRef を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数ワーカーから同時に使われる）
pub trait IdGenerator: Send + Sync {
    fn generate_content_ref(&self) -> ContentRef;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// テスト時に FixedClock を使うと timestamp 部分が固定される。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_content_ref(&self) -> ContentRef {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        ContentRef::from_ulid(ulid)
    }
}
