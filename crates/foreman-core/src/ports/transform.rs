//! Transform port - タスクの中身の処理（bytes -> bytes）
//!
//! 何をするか（単語数え、画素の並べ替え…）はエンジンの関心外。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("empty input")]
    Empty,
}

/// Transform は入力 bytes から出力 bytes を作る。失敗してよい
///
/// CPU だけを使う同期処理を想定している。
pub trait Transform: Send + Sync {
    /// ログ用の名前
    fn name(&self) -> &str;

    fn apply(&self, input: &[u8]) -> Result<Vec<u8>, TransformError>;
}
