//! CSV dump/load of an already-traversed subtree: a nodes file (`index,hash`) and a leaves file
//! produced by a caller-supplied per-leaf formatter, plus the inverse reconstruction.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use committee_storage::Storage;
use tokio::sync::Mutex as AsyncMutex;

use crate::errors::{TreeError, TreeResult};
use crate::hash::{HashOutput, Hasher};
use crate::leaf::{leaf_key, LeafFact};
use crate::traversal::traverse_tree;
use crate::tree::MerkleTree;

/// Dumps `tree` starting from array index `root_index` (`1` for the whole tree, a higher index
/// to dump only a subtree) into two CSV streams: every visited node's `(array_index, hash)` into
/// `nodes`, and every visited leaf's formatted fields (via `format_leaf`) into `leaves`. Subtrees
/// whose root hash is a precomputed empty-tree root are skipped without any storage read.
pub async fn dump_tree<L: LeafFact>(
    store: &dyn Storage,
    hasher: &dyn Hasher,
    tree: &MerkleTree,
    root_index: u64,
    mut nodes: Option<&mut dyn Write>,
    mut leaves: Option<&mut dyn Write>,
    format_leaf: impl Fn(u64, &L) -> String + Send + Sync,
) -> TreeResult<()> {
    let empty_roots: HashSet<HashOutput> = MerkleTree::empty_tree_roots::<L>(tree.height, hasher).into_iter().collect();

    let node_rows: Arc<AsyncMutex<Vec<(u64, HashOutput)>>> = Arc::new(AsyncMutex::new(Vec::new()));
    let leaf_rows: Arc<AsyncMutex<Vec<String>>> = Arc::new(AsyncMutex::new(Vec::new()));
    let leaf_base = root_index << tree.height;

    traverse_tree((root_index, *tree), 8, |array_index, subtree| {
        let node_rows = Arc::clone(&node_rows);
        let leaf_rows = Arc::clone(&leaf_rows);
        let format_leaf = &format_leaf;
        async move {
            if empty_roots.contains(&subtree.root) {
                return Ok(vec![]);
            }
            node_rows.lock().await.push((array_index, subtree.root));
            if subtree.height == 0 {
                let bytes = store
                    .get(&leaf_key::<L>(&subtree.root))
                    .await?
                    .ok_or_else(|| TreeError::MissingLeaf(subtree.root.to_hex()))?;
                let leaf = L::deserialize(&bytes)?;
                let leaf_index = array_index - leaf_base;
                leaf_rows.lock().await.push(format_leaf(leaf_index, &leaf));
                return Ok(vec![]);
            }
            let (left, right) = subtree.get_children(store).await?;
            Ok(vec![(array_index * 2, left), (array_index * 2 + 1, right)])
        }
    })
    .await?;

    let node_rows = Arc::try_unwrap(node_rows).expect("traversal complete").into_inner();
    let leaf_rows = Arc::try_unwrap(leaf_rows).expect("traversal complete").into_inner();

    if let Some(writer) = nodes.as_deref_mut() {
        for (index, hash) in node_rows {
            writeln!(writer, "{index},{}", hash.to_hex()).map_err(|e| TreeError::Traversal(e.to_string()))?;
        }
    }
    if let Some(writer) = leaves.as_deref_mut() {
        for row in leaf_rows {
            writeln!(writer, "{row}").map_err(|e| TreeError::Traversal(e.to_string()))?;
        }
    }
    Ok(())
}

/// Reconstructs a tree of the given height from a set of already-parsed `(leaf_index, leaf)`
/// pairs by replaying them as an update over a fresh empty tree. This is the inverse of
/// `dump_tree`'s leaf stream, not of its node stream — the node file is diagnostic output, not
/// required to rebuild the tree.
pub async fn load_tree<L: LeafFact>(
    store: &dyn Storage,
    hasher: &dyn Hasher,
    height: u32,
    leaves: Vec<(u64, L)>,
) -> TreeResult<MerkleTree> {
    let empty = MerkleTree::empty_tree::<L>(store, hasher, height).await?;
    empty.update(store, hasher, leaves).await
}

#[cfg(test)]
mod tests {
    use committee_storage::MapStorage;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::hash::PedersenHasher;

    #[derive(Clone, PartialEq, Debug)]
    struct Amount(u64);

    impl LeafFact for Amount {
        fn empty() -> Self {
            Amount(0)
        }
        fn is_empty(&self) -> bool {
            self.0 == 0
        }
        fn serialize(&self) -> Vec<u8> {
            self.0.to_le_bytes().to_vec()
        }
        fn deserialize(bytes: &[u8]) -> TreeResult<Self> {
            Ok(Amount(u64::from_le_bytes(bytes.try_into().expect("8 bytes"))))
        }
        fn hash(&self, hasher: &dyn Hasher) -> HashOutput {
            let mut bytes = [0u8; 32];
            bytes[24..].copy_from_slice(&self.0.to_be_bytes());
            hasher.hash(&HashOutput::from_bytes(&bytes), &HashOutput::from_bytes(&[0u8; 32]))
        }
        fn prefix() -> &'static [u8] {
            b"amount"
        }
    }

    #[tokio::test]
    async fn dump_then_load_round_trips_the_root() {
        let store = MapStorage::new();
        let hasher = PedersenHasher;
        let empty = MerkleTree::empty_tree::<Amount>(&store, &hasher, 4).await.unwrap();
        let populated = empty.update(&store, &hasher, vec![(2, Amount(10)), (9, Amount(20))]).await.unwrap();

        let mut nodes_buf = Vec::new();
        let mut leaves_buf = Vec::new();
        dump_tree::<Amount>(
            &store,
            &hasher,
            &populated,
            1,
            Some(&mut nodes_buf),
            Some(&mut leaves_buf),
            |index, leaf| format!("{index},{}", leaf.0),
        )
        .await
        .unwrap();

        let parsed: Vec<(u64, Amount)> = String::from_utf8(leaves_buf)
            .unwrap()
            .lines()
            .map(|line| {
                let (idx, amount) = line.split_once(',').unwrap();
                (idx.parse().unwrap(), Amount(amount.parse().unwrap()))
            })
            .collect();

        let reloaded = load_tree::<Amount>(&store, &hasher, 4, parsed).await.unwrap();
        assert_eq!(reloaded.root, populated.root);
    }
}
