//! ContentStore port - Blob ストレージ
//!
//! タスクの入力と出力の中身はここに置く。Task Store は参照（ContentRef）しか持たない。

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ContentRef, ErrorKind};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content not found: {0}")]
    NotFound(ContentRef),

    #[error("content store unavailable: {0}")]
    Unavailable(String),
}

impl ContentError {
    pub fn kind(&self) -> ErrorKind {
        // NotFound も「そのうち書かれるかもしれない」ので Transient 扱い
        ErrorKind::Transient
    }
}

/// ContentStore は不透明な参照で blob を読み書きする
///
/// # 設計原則
/// - `put` は呼ぶたびに新しい参照を発行する（上書きしない）
/// - 参照の形式は実装が決める。呼び出し側は中身を解釈しない
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get(&self, content_ref: &ContentRef) -> Result<Vec<u8>, ContentError>;

    async fn put(&self, bytes: Vec<u8>) -> Result<ContentRef, ContentError>;
}
