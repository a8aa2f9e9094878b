use std::collections::BTreeMap;

use committee_patricia::{HashOutput, Hasher, MerkleTree};
use committee_storage::Storage;
use serde::{Deserialize, Serialize};

use crate::errors::CoreResult;
use crate::order::OrderState;
use crate::position::PositionState;
use crate::registry::{CommitteeObjectConfig, CommitteeObjectKind};
use crate::vault::VaultState;

pub const NEXT_BATCH_ID_KEY: &[u8] = b"committee_next_batch_id";

fn new_batch_info_key(batch_id: i64) -> Vec<u8> {
    format!("new_committee_batch_info:{batch_id}").into_bytes()
}

fn legacy_batch_info_key(batch_id: i64) -> Vec<u8> {
    format!("committee_batch_info:{batch_id}").into_bytes()
}

/// The committee's own record of a validated batch: the roots it last computed or accepted for
/// every configured named tree, and its own monotonic sequence number (distinct from `batch_id`).
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct CommitteeBatchInfo {
    pub merkle_roots: BTreeMap<String, HashOutput>,
    pub sequence_number: i64,
}

/// Reads the batch info for `batch_id`, preferring the current key and falling back to the
/// legacy one. A legacy hit is rewritten under the current key before returning, so every
/// subsequent read is a direct hit.
pub async fn read_batch_info(store: &dyn Storage, batch_id: i64) -> CoreResult<Option<CommitteeBatchInfo>> {
    if let Some(bytes) = store.get(&new_batch_info_key(batch_id)).await? {
        return Ok(Some(serde_json::from_slice(&bytes).map_err(|e| {
            committee_storage::StorageError::Backend(format!("corrupt batch info for {batch_id}: {e}"))
        })?));
    }
    let Some(bytes) = store.get(&legacy_batch_info_key(batch_id)).await? else {
        return Ok(None);
    };
    let info: CommitteeBatchInfo = serde_json::from_slice(&bytes).map_err(|e| {
        committee_storage::StorageError::Backend(format!("corrupt legacy batch info for {batch_id}: {e}"))
    })?;
    write_batch_info(store, batch_id, &info).await?;
    Ok(Some(info))
}

/// Writes `info` under the current key for `batch_id`. Never touches the legacy key — the only
/// writer of the legacy key is the original system this one interoperates with.
pub async fn write_batch_info(store: &dyn Storage, batch_id: i64, info: &CommitteeBatchInfo) -> CoreResult<()> {
    let bytes = serde_json::to_vec(info)
        .map_err(|e| committee_storage::StorageError::Backend(format!("failed to encode batch info: {e}")))?;
    store.set(new_batch_info_key(batch_id), bytes).await?;
    Ok(())
}

pub async fn read_next_batch_id(store: &dyn Storage) -> CoreResult<u64> {
    Ok(store.get_int(NEXT_BATCH_ID_KEY).await?.unwrap_or(0) as u64)
}

pub async fn write_next_batch_id(store: &dyn Storage, batch_id: u64) -> CoreResult<()> {
    store.set_int(NEXT_BATCH_ID_KEY.to_vec(), batch_id as i64).await?;
    Ok(())
}

/// Builds the initial batch (`batch_id = -1`, `sequence_number = -1`): every configured object's
/// empty-tree root at its configured height.
pub async fn compute_initial_batch_info(
    objects: &[CommitteeObjectConfig],
    store: &dyn Storage,
    hasher: &dyn Hasher,
) -> CoreResult<CommitteeBatchInfo> {
    let mut merkle_roots = BTreeMap::new();
    for object in objects {
        let root = empty_root_for_kind(object.kind, object.merkle_height, store, hasher).await?;
        merkle_roots.insert(object.name.clone(), root);
    }
    Ok(CommitteeBatchInfo { merkle_roots, sequence_number: -1 })
}

/// Dispatches to the right leaf type's `empty_tree` based on the configured kind; this is the
/// one place that must be kept exhaustive as new kinds are added.
pub async fn empty_root_for_kind(
    kind: CommitteeObjectKind,
    height: u32,
    store: &dyn Storage,
    hasher: &dyn Hasher,
) -> CoreResult<HashOutput> {
    let root = match kind {
        CommitteeObjectKind::Vault | CommitteeObjectKind::RollupVault => {
            MerkleTree::empty_tree::<VaultState>(store, hasher, height).await?.root
        }
        CommitteeObjectKind::Order => MerkleTree::empty_tree::<OrderState>(store, hasher, height).await?.root,
        CommitteeObjectKind::Position => MerkleTree::empty_tree::<PositionState>(store, hasher, height).await?.root,
    };
    Ok(root)
}

#[cfg(test)]
mod tests {
    use committee_patricia::PedersenHasher;
    use committee_storage::MapStorage;
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn initial_batch_has_sequence_number_minus_one() {
        let store = MapStorage::new();
        let hasher = PedersenHasher;
        let objects = vec![
            CommitteeObjectConfig { name: "vault".into(), kind: CommitteeObjectKind::Vault, merkle_height: 4 },
            CommitteeObjectConfig { name: "order".into(), kind: CommitteeObjectKind::Order, merkle_height: 4 },
        ];
        let info = compute_initial_batch_info(&objects, &store, &hasher).await.unwrap();
        assert_eq!(info.sequence_number, -1);
        assert_eq!(info.merkle_roots.len(), 2);
    }

    #[tokio::test]
    async fn legacy_key_is_migrated_on_read() {
        let store = MapStorage::new();
        let info = CommitteeBatchInfo { merkle_roots: BTreeMap::new(), sequence_number: -1 };
        let bytes = serde_json::to_vec(&info).unwrap();
        store.set(legacy_batch_info_key(-1), bytes).await.unwrap();

        let read = read_batch_info(&store, -1).await.unwrap().unwrap();
        assert_eq!(read, info);
        assert!(store.get(&new_batch_info_key(-1)).await.unwrap().is_some());

        // A second read must hit the new key directly (and still agree).
        let read_again = read_batch_info(&store, -1).await.unwrap().unwrap();
        assert_eq!(read_again, info);
    }

    #[tokio::test]
    async fn missing_batch_info_is_none() {
        let store = MapStorage::new();
        assert!(read_batch_info(&store, 5).await.unwrap().is_none());
    }
}
