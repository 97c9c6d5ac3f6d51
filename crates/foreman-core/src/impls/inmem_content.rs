//! InMemoryContentStore - 開発用の Content Store
//!
//! # 実装詳細
//! - HashMap<ContentRef, Arc<[u8]>> を tokio の RwLock で守る
//! - put のたびに IdGenerator で新しい参照を発行する
//! - 再起動で中身は消える（永続化はしない）

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::ContentRef;
use crate::ports::{ContentError, ContentStore, IdGenerator, SystemClock, UlidGenerator};

/// InMemoryContentStore は開発用の blob ストア
///
/// # 使用例
/// ```ignore
/// let store = InMemoryContentStore::new();
/// let r = store.put(b"hello".to_vec()).await?;
/// let bytes = store.get(&r).await?;
/// ```
pub struct InMemoryContentStore {
    blobs: RwLock<HashMap<ContentRef, Arc<[u8]>>>,
    id_gen: Box<dyn IdGenerator>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::with_id_generator(Box::new(UlidGenerator::new(SystemClock)))
    }

    pub fn with_id_generator(id_gen: Box<dyn IdGenerator>) -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            id_gen,
        }
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    pub async fn contains(&self, content_ref: &ContentRef) -> bool {
        self.blobs.read().await.contains_key(content_ref)
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn get(&self, content_ref: &ContentRef) -> Result<Vec<u8>, ContentError> {
        self.blobs
            .read()
            .await
            .get(content_ref)
            .map(|b| b.to_vec())
            .ok_or_else(|| ContentError::NotFound(content_ref.clone()))
    }

    async fn put(&self, bytes: Vec<u8>) -> Result<ContentRef, ContentError> {
        let mut blobs = self.blobs.write().await;
        // ULID が衝突することはまず無いが、上書きだけはしない
        let content_ref = loop {
            let candidate = self.id_gen.generate_content_ref();
            if !blobs.contains_key(&candidate) {
                break candidate;
            }
        };
        blobs.insert(content_ref.clone(), Arc::from(bytes));
        Ok(content_ref)
    }
}
