//! InMemoryDiscovery - 名前 -> アドレスの登録簿（key-value store 相当）
//!
//! 各サービスは起動時に自分のアドレスを register し、利用側は resolve で引く。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::ports::{Discovery, DiscoveryError};

#[derive(Default)]
pub struct InMemoryDiscovery {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the address for `name`.
    pub async fn register(&self, name: impl Into<String>, address: impl Into<String>) {
        let (name, address) = (name.into(), address.into());
        tracing::debug!(%name, %address, "service registered");
        self.entries.write().await.insert(name, address);
    }

    pub async fn remove(&self, name: &str) -> Option<String> {
        self.entries.write().await.remove(name)
    }

    /// All registrations, sorted by name.
    pub async fn list(&self) -> Vec<(String, String)> {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort();
        entries
    }
}

#[async_trait]
impl Discovery for InMemoryDiscovery {
    async fn resolve(&self, name: &str) -> Result<String, DiscoveryError> {
        match self.entries.read().await.get(name) {
            None => Err(DiscoveryError::Unknown(name.to_string())),
            Some(address) if address.is_empty() => Err(DiscoveryError::Empty(name.to_string())),
            Some(address) => Ok(address.clone()),
        }
    }
}
