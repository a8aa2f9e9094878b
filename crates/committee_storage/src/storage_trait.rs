use async_trait::async_trait;

use crate::errors::StorageResult;

/// A content-addressed / named key-value contract backing the committee's facts.
///
/// A miss is not an error: `get` returns `Ok(None)`. Implementations are expected to retry
/// transient backend timeouts internally and only surface `StorageError::TooManyAttempts` once
/// their retry budget is exhausted.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()>;

    /// Writes `value` only if `key` is absent. Returns whether the write happened.
    async fn set_if_absent(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<bool>;

    async fn delete(&self, key: &[u8]) -> StorageResult<bool>;

    async fn get_int(&self, key: &[u8]) -> StorageResult<Option<i64>> {
        match self.get(key).await? {
            None => Ok(None),
            Some(bytes) => {
                let s = String::from_utf8(bytes).map_err(|_| crate::errors::StorageError::InvalidInt(key.to_vec()))?;
                s.trim()
                    .parse::<i64>()
                    .map(Some)
                    .map_err(|_| crate::errors::StorageError::InvalidInt(key.to_vec()))
            }
        }
    }

    async fn set_int(&self, key: Vec<u8>, value: i64) -> StorageResult<()> {
        self.set(key, value.to_string().into_bytes()).await
    }
}
