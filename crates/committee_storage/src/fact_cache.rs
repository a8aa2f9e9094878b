use std::num::NonZeroUsize;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;

use crate::errors::StorageResult;
use crate::storage_trait::Storage;

/// A read-through, capacity-bounded LRU layer over a `Storage`. Holds opaque byte blobs only;
/// decoding facts is the caller's responsibility.
pub struct FactCache<S> {
    inner: S,
    cache: Mutex<LruCache<Vec<u8>, Vec<u8>>>,
}

impl<S: Storage> FactCache<S> {
    pub fn new(inner: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self { inner, cache: Mutex::new(LruCache::new(capacity)) }
    }
}

#[async_trait]
impl<S: Storage> Storage for FactCache<S> {
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        if let Some(hit) = self.cache.lock().await.get(key) {
            return Ok(Some(hit.clone()));
        }
        let value = self.inner.get(key).await?;
        if let Some(ref v) = value {
            self.cache.lock().await.put(key.to_vec(), v.clone());
        }
        Ok(value)
    }

    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        self.inner.set(key.clone(), value.clone()).await?;
        self.cache.lock().await.put(key, value);
        Ok(())
    }

    async fn set_if_absent(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<bool> {
        let written = self.inner.set_if_absent(key.clone(), value.clone()).await?;
        if written {
            self.cache.lock().await.put(key, value);
        }
        Ok(written)
    }

    async fn delete(&self, key: &[u8]) -> StorageResult<bool> {
        self.cache.lock().await.pop(key);
        self.inner.delete(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_storage::MapStorage;

    #[tokio::test]
    async fn hit_does_not_reach_the_backing_store() {
        let backing = MapStorage::new();
        backing.set(b"k".to_vec(), b"v".to_vec()).await.unwrap();
        let cache = FactCache::new(backing.clone(), 10);
        assert_eq!(cache.get(b"k").await.unwrap(), Some(b"v".to_vec()));
        backing.delete(b"k").await.unwrap();
        // Still served from cache even though the backing store no longer has it.
        assert_eq!(cache.get(b"k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn writes_go_through_and_populate_cache() {
        let backing = MapStorage::new();
        let cache = FactCache::new(backing.clone(), 10);
        cache.set(b"k".to_vec(), b"v".to_vec()).await.unwrap();
        assert_eq!(backing.get(b"k").await.unwrap(), Some(b"v".to_vec()));
    }
}
