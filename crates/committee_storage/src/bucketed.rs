use std::collections::HashMap;

use async_trait::async_trait;
use sha3::{Digest, Sha3_256};

use crate::errors::{StorageError, StorageResult};
use crate::storage_trait::Storage;

/// Collapses a large key population onto a small number of records by hashing each key into
/// `bucket_index_bits` bits and storing every key that lands in a bucket as a field of one
/// record (an encoded `key -> value` map). Chosen to keep the average bucket size around 10KB
/// rather than paying a per-key record overhead on the backing store.
pub struct BucketedStorage<S> {
    inner: S,
    bucket_index_bits: u32,
}

/// 28 bits matches the original Aerospike-backed implementation's default, and is still a
/// reasonable working point for 32-byte hash keys sized towards ~10KB buckets.
pub const DEFAULT_BUCKET_INDEX_BITS: u32 = 28;

impl<S: Storage> BucketedStorage<S> {
    pub fn new(inner: S, bucket_index_bits: u32) -> Self {
        assert!(bucket_index_bits <= 64, "bucket_index_bits must fit in a u64 mask");
        Self { inner, bucket_index_bits }
    }

    pub fn with_default_bits(inner: S) -> Self {
        Self::new(inner, DEFAULT_BUCKET_INDEX_BITS)
    }

    fn bucket_key(&self, key: &[u8]) -> Vec<u8> {
        let digest = Sha3_256::digest(key);
        let hashed = u64::from_le_bytes(digest[..8].try_into().expect("digest is >= 8 bytes"));
        let mask = if self.bucket_index_bits == 64 { u64::MAX } else { (1u64 << self.bucket_index_bits) - 1 };
        (hashed & mask).to_le_bytes().to_vec()
    }

    async fn load_bucket(&self, bucket_key: &[u8]) -> StorageResult<HashMap<Vec<u8>, Vec<u8>>> {
        match self.inner.get(bucket_key).await? {
            None => Ok(HashMap::new()),
            Some(bytes) => decode_bucket(&bytes),
        }
    }
}

#[async_trait]
impl<S: Storage> Storage for BucketedStorage<S> {
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let bucket_key = self.bucket_key(key);
        let bucket = self.load_bucket(&bucket_key).await?;
        Ok(bucket.get(key).cloned())
    }

    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        let bucket_key = self.bucket_key(&key);
        let mut bucket = self.load_bucket(&bucket_key).await?;
        bucket.insert(key, value);
        self.inner.set(bucket_key, encode_bucket(&bucket)).await
    }

    async fn set_if_absent(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<bool> {
        let bucket_key = self.bucket_key(&key);
        let mut bucket = self.load_bucket(&bucket_key).await?;
        if bucket.contains_key(&key) {
            return Ok(false);
        }
        bucket.insert(key, value);
        self.inner.set(bucket_key, encode_bucket(&bucket)).await?;
        Ok(true)
    }

    async fn delete(&self, key: &[u8]) -> StorageResult<bool> {
        let bucket_key = self.bucket_key(key);
        let mut bucket = self.load_bucket(&bucket_key).await?;
        let removed = bucket.remove(key).is_some();
        if removed {
            self.inner.set(bucket_key, encode_bucket(&bucket)).await?;
        }
        Ok(removed)
    }
}

fn encode_bucket(bucket: &HashMap<Vec<u8>, Vec<u8>>) -> Vec<u8> {
    let mut out = Vec::new();
    for (k, v) in bucket {
        out.extend_from_slice(&(k.len() as u32).to_le_bytes());
        out.extend_from_slice(k);
        out.extend_from_slice(&(v.len() as u32).to_le_bytes());
        out.extend_from_slice(v);
    }
    out
}

fn decode_bucket(bytes: &[u8]) -> StorageResult<HashMap<Vec<u8>, Vec<u8>>> {
    let mut map = HashMap::new();
    let mut cursor = 0usize;
    while cursor < bytes.len() {
        let klen = read_u32(bytes, &mut cursor)?;
        let key = read_bytes(bytes, &mut cursor, klen)?;
        let vlen = read_u32(bytes, &mut cursor)?;
        let value = read_bytes(bytes, &mut cursor, vlen)?;
        map.insert(key, value);
    }
    Ok(map)
}

fn read_u32(bytes: &[u8], cursor: &mut usize) -> StorageResult<u32> {
    let slice = bytes
        .get(*cursor..*cursor + 4)
        .ok_or_else(|| StorageError::Backend("truncated bucket record".to_string()))?;
    *cursor += 4;
    Ok(u32::from_le_bytes(slice.try_into().expect("slice is 4 bytes")))
}

fn read_bytes(bytes: &[u8], cursor: &mut usize, len: u32) -> StorageResult<Vec<u8>> {
    let len = len as usize;
    let slice = bytes
        .get(*cursor..*cursor + len)
        .ok_or_else(|| StorageError::Backend("truncated bucket record".to_string()))?;
    *cursor += len;
    Ok(slice.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_storage::MapStorage;

    #[tokio::test]
    async fn bucketed_round_trip_across_many_keys() {
        let storage = BucketedStorage::new(MapStorage::new(), 4);
        for i in 0u32..50 {
            storage.set(format!("key-{i}").into_bytes(), format!("value-{i}").into_bytes()).await.unwrap();
        }
        for i in 0u32..50 {
            let got = storage.get(format!("key-{i}").as_bytes()).await.unwrap();
            assert_eq!(got, Some(format!("value-{i}").into_bytes()));
        }
    }

    #[tokio::test]
    async fn delete_only_removes_the_one_key_in_its_bucket() {
        let storage = BucketedStorage::new(MapStorage::new(), 4);
        storage.set(b"a".to_vec(), b"1".to_vec()).await.unwrap();
        storage.set(b"b".to_vec(), b"2".to_vec()).await.unwrap();
        storage.delete(b"a").await.unwrap();
        assert_eq!(storage.get(b"a").await.unwrap(), None);
        assert_eq!(storage.get(b"b").await.unwrap(), Some(b"2".to_vec()));
    }
}
