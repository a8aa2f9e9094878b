use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::StorageResult;
use crate::storage_trait::Storage;

/// An in-memory `Storage` backed by a `HashMap`, for tests and the initial-batch fixture.
#[derive(Clone, Default)]
pub struct MapStorage {
    inner: Arc<RwLock<HashMap<Vec<u8>, Vec<u8>>>>,
}

impl MapStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// A full copy of the current contents. Used by tooling (the dump/load CLI's snapshot file)
    /// that needs to persist a `MapStorage` across process runs; the `Storage` trait itself has
    /// no enumeration method, matching a real content-addressed backend that wouldn't offer one
    /// either.
    pub async fn snapshot(&self) -> HashMap<Vec<u8>, Vec<u8>> {
        self.inner.read().await.clone()
    }

    pub fn from_entries(entries: HashMap<Vec<u8>, Vec<u8>>) -> Self {
        Self { inner: Arc::new(RwLock::new(entries)) }
    }
}

#[async_trait]
impl Storage for MapStorage {
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.inner.read().await.get(key).cloned())
    }

    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        self.inner.write().await.insert(key, value);
        Ok(())
    }

    async fn set_if_absent(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<bool> {
        let mut guard = self.inner.write().await;
        if guard.contains_key(&key) {
            Ok(false)
        } else {
            guard.insert(key, value);
            Ok(true)
        }
    }

    async fn delete(&self, key: &[u8]) -> StorageResult<bool> {
        Ok(self.inner.write().await.remove(key).is_some())
    }
}
