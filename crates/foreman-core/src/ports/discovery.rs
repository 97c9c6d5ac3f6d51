//! Discovery port - サービス名からアドレスを引く
//!
//! 起動時に依存サービス（dispatcher, content store）の場所を解決するのに使う。
//! 1 回の失敗でワーカーを止めない。固定 backoff でやり直す。

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ErrorKind;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("no address registered for {0}")]
    Unknown(String),

    #[error("empty address registered for {0}")]
    Empty(String),

    #[error("discovery unavailable: {0}")]
    Unavailable(String),

    #[error("could not resolve {name} after {attempts} attempts: {last}")]
    Exhausted {
        name: String,
        attempts: u32,
        last: Box<DiscoveryError>,
    },
}

impl DiscoveryError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Transient
    }
}

#[async_trait]
pub trait Discovery: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<String, DiscoveryError>;
}

/// `name` を解決できるまで固定間隔でやり直す
///
/// 各試行は `timeout` で打ち切る。`max_attempts` 回失敗したら最後のエラーを返す。
pub async fn resolve_with_retry(
    discovery: &dyn Discovery,
    name: &str,
    timeout: Duration,
    backoff: Duration,
    max_attempts: u32,
) -> Result<String, DiscoveryError> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        let err = match tokio::time::timeout(timeout, discovery.resolve(name)).await {
            Ok(Ok(address)) => return Ok(address),
            Ok(Err(e)) => e,
            Err(_) => DiscoveryError::Unavailable(format!("timed out after {timeout:?}")),
        };

        if attempts >= max_attempts {
            return Err(DiscoveryError::Exhausted {
                name: name.to_string(),
                attempts,
                last: Box::new(err),
            });
        }

        tracing::warn!(%name, attempts, error = %err, "discovery failed, retrying");
        tokio::time::sleep(backoff).await;
    }
}
