use std::collections::BTreeMap;
use std::sync::Arc;

use committee_storage::Storage;
use tokio::sync::Mutex as AsyncMutex;

use crate::calculation::{evaluate, plan_update};
use crate::errors::{TreeError, TreeResult};
use crate::hash::{HashOutput, Hasher};
use crate::leaf::{leaf_key, LeafFact};
use crate::node_fact::{read_node_fact, write_node_fact, MerkleNodeFact};
use crate::traversal::traverse_tree;

/// An immutable reference into the fact store: a root hash plus the height of the tree rooted
/// there. Every mutating operation returns a new `MerkleTree`; the fact store itself is
/// append-only, so historic trees remain navigable after later updates.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MerkleTree {
    pub root: HashOutput,
    pub height: u32,
}

impl MerkleTree {
    /// Builds the canonical empty tree of the given height: writes the empty leaf fact, then
    /// walks upward `height` times, each step combining the previous root with itself.
    pub async fn empty_tree<L: LeafFact>(store: &dyn Storage, hasher: &dyn Hasher, height: u32) -> TreeResult<Self> {
        let leaf = L::empty();
        let mut root = leaf.hash(hasher);
        store.set(leaf_key::<L>(&root), leaf.serialize()).await?;
        for _ in 0..height {
            root = write_node_fact(store, hasher, &MerkleNodeFact { left: root, right: root }).await?;
        }
        Ok(Self { root, height })
    }

    /// Pure function: the sequence `E[0..=max_height]` of empty-subtree roots for `L`, with no
    /// storage access. Used to prune empty subtrees during traversal.
    pub fn empty_tree_roots<L: LeafFact>(max_height: u32, hasher: &dyn Hasher) -> Vec<HashOutput> {
        let mut roots = Vec::with_capacity(max_height as usize + 1);
        let mut current = L::empty().hash(hasher);
        roots.push(current);
        for _ in 0..max_height {
            current = hasher.hash(&current, &current);
            roots.push(current);
        }
        roots
    }

    /// Precondition: `self.height > 0`.
    pub async fn get_children(&self, store: &dyn Storage) -> TreeResult<(MerkleTree, MerkleTree)> {
        if self.height == 0 {
            return Err(TreeError::LeafHasNoChildren);
        }
        let fact = read_node_fact(store, &self.root).await?;
        Ok((
            MerkleTree { root: fact.left, height: self.height - 1 },
            MerkleTree { root: fact.right, height: self.height - 1 },
        ))
    }

    /// Binary-tree-in-array indexing: `1` is `self`, `2`/`3` are its children, and so on. The
    /// bits of `index` after the leading `1` drive left (`0`)/right (`1`) descent.
    pub async fn get_node(&self, store: &dyn Storage, index: u64) -> TreeResult<MerkleTree> {
        let bits = path_bits(index);
        if bits.len() as u32 > self.height {
            return Err(TreeError::IndexOutOfRange(index));
        }
        let mut node = *self;
        for go_right in bits {
            let (left, right) = node.get_children(store).await?;
            node = if go_right { right } else { left };
        }
        Ok(node)
    }

    /// Fetches and deserializes every requested leaf. Descents sharing a path prefix are driven
    /// through the bounded-parallel traversal driver so a single read of a shared ancestor isn't
    /// repeated once per leaf under it.
    pub async fn get_leaves<L: LeafFact>(
        &self,
        store: &dyn Storage,
        indices: &[u64],
        n_workers: usize,
    ) -> TreeResult<BTreeMap<u64, L>> {
        let size = 1u64 << self.height;
        for &index in indices {
            if index >= size {
                return Err(TreeError::IndexOutOfRange(index));
            }
        }
        if indices.is_empty() {
            return Ok(BTreeMap::new());
        }

        let results = Arc::new(AsyncMutex::new(BTreeMap::new()));
        let mut targets: Vec<u64> = indices.to_vec();
        targets.sort_unstable();
        targets.dedup();

        let root_item = (*self, 0u64, targets);
        traverse_tree(
            (1, root_item),
            n_workers.max(1),
            |_array_index, (subtree, leaf_offset, targets): (MerkleTree, u64, Vec<u64>)| {
                let results = Arc::clone(&results);
                async move {
                    if subtree.height == 0 {
                        let bytes = store
                            .get(&leaf_key::<L>(&subtree.root))
                            .await?
                            .ok_or_else(|| TreeError::MissingLeaf(subtree.root.to_hex()))?;
                        let leaf = L::deserialize(&bytes)?;
                        results.lock().await.insert(leaf_offset, leaf);
                        return Ok(vec![]);
                    }
                    let (left_tree, right_tree) = subtree.get_children(store).await?;
                    let mid = leaf_offset + (1u64 << (subtree.height - 1));
                    let mut left_targets = Vec::new();
                    let mut right_targets = Vec::new();
                    for target in targets {
                        if target < mid {
                            left_targets.push(target);
                        } else {
                            right_targets.push(target);
                        }
                    }
                    let mut children = Vec::new();
                    if !left_targets.is_empty() {
                        children.push((0, (left_tree, leaf_offset, left_targets)));
                    }
                    if !right_targets.is_empty() {
                        children.push((1, (right_tree, mid, right_targets)));
                    }
                    Ok(children)
                }
            },
        )
        .await?;

        Ok(Arc::try_unwrap(results).expect("traversal has completed, no other owners remain").into_inner())
    }

    /// Applies `modifications` to `self` in one traversal, returning the new root. Subtrees with
    /// no modification keep their existing hash; everything else is recomputed and persisted
    /// before the new root is returned.
    pub async fn update<L: LeafFact>(
        &self,
        store: &dyn Storage,
        hasher: &dyn Hasher,
        modifications: Vec<(u64, L)>,
    ) -> TreeResult<MerkleTree> {
        let size = 1u64 << self.height;
        let mut by_index = BTreeMap::new();
        for (index, leaf) in modifications {
            if index >= size {
                return Err(TreeError::IndexOutOfRange(index));
            }
            // Later entries win on duplicate indices: BTreeMap::insert overwrites.
            by_index.insert(index, leaf);
        }
        if by_index.is_empty() {
            return Ok(*self);
        }
        let plan = plan_update(store, *self, 0, &by_index).await?;
        let root = evaluate(plan, store, hasher).await?;
        Ok(MerkleTree { root, height: self.height })
    }
}

/// Returns, MSB-first, the path bits after the leading `1` bit of `index`'s binary
/// representation (the "binary tree in array" convention: `1` is the root, `2n`/`2n+1` are the
/// children of `n`). `false` means descend left, `true` means descend right.
fn path_bits(index: u64) -> Vec<bool> {
    if index == 0 {
        return vec![true; 64]; // Guaranteed to exceed any real tree height and fail range checks.
    }
    let bit_len = 64 - index.leading_zeros();
    (0..bit_len - 1).rev().map(|shift| (index >> shift) & 1 == 1).collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::hash::PedersenHasher;
    use committee_storage::MapStorage;

    #[derive(Clone, PartialEq, Debug)]
    struct TestLeaf(u64);

    impl LeafFact for TestLeaf {
        fn empty() -> Self {
            TestLeaf(0)
        }
        fn is_empty(&self) -> bool {
            self.0 == 0
        }
        fn serialize(&self) -> Vec<u8> {
            self.0.to_le_bytes().to_vec()
        }
        fn deserialize(bytes: &[u8]) -> TreeResult<Self> {
            Ok(TestLeaf(u64::from_le_bytes(bytes.try_into().expect("8 bytes"))))
        }
        fn hash(&self, hasher: &dyn Hasher) -> HashOutput {
            let mut bytes = [0u8; 32];
            bytes[24..].copy_from_slice(&self.0.to_be_bytes());
            hasher.hash(&HashOutput::from_bytes(&bytes), &HashOutput::from_bytes(&[0u8; 32]))
        }
        fn prefix() -> &'static [u8] {
            b"test_leaf"
        }
    }

    #[tokio::test]
    async fn empty_tree_root_matches_empty_tree_roots() {
        let store = MapStorage::new();
        let hasher = PedersenHasher;
        for height in [0u32, 1, 3, 8] {
            let tree = MerkleTree::empty_tree::<TestLeaf>(&store, &hasher, height).await.unwrap();
            let roots = MerkleTree::empty_tree_roots::<TestLeaf>(height, &hasher);
            assert_eq!(tree.root, roots[height as usize]);
        }
    }

    #[tokio::test]
    async fn single_leaf_round_trip() {
        let store = MapStorage::new();
        let hasher = PedersenHasher;
        let empty = MerkleTree::empty_tree::<TestLeaf>(&store, &hasher, 4).await.unwrap();
        let updated = empty.update(&store, &hasher, vec![(5, TestLeaf(42))]).await.unwrap();
        let leaves = updated.get_leaves::<TestLeaf>(&store, &[5], 4).await.unwrap();
        assert_eq!(leaves.get(&5), Some(&TestLeaf(42)));
    }

    #[tokio::test]
    async fn update_is_order_independent_for_distinct_indices() {
        let store = MapStorage::new();
        let hasher = PedersenHasher;
        let empty = MerkleTree::empty_tree::<TestLeaf>(&store, &hasher, 4).await.unwrap();
        let a = empty.update(&store, &hasher, vec![(1, TestLeaf(1)), (2, TestLeaf(2))]).await.unwrap();
        let b = empty.update(&store, &hasher, vec![(2, TestLeaf(2)), (1, TestLeaf(1))]).await.unwrap();
        assert_eq!(a.root, b.root);
    }

    #[tokio::test]
    async fn no_op_update_leaves_root_unchanged() {
        let store = MapStorage::new();
        let hasher = PedersenHasher;
        let empty = MerkleTree::empty_tree::<TestLeaf>(&store, &hasher, 4).await.unwrap();
        let unchanged = empty.update(&store, &hasher, vec![(3, TestLeaf::empty())]).await.unwrap();
        assert_eq!(empty.root, unchanged.root);
    }

    #[tokio::test]
    async fn structural_sharing_leaves_untouched_leaves_reachable() {
        let store = MapStorage::new();
        let hasher = PedersenHasher;
        let empty = MerkleTree::empty_tree::<TestLeaf>(&store, &hasher, 4).await.unwrap();
        let updated = empty.update(&store, &hasher, vec![(0, TestLeaf(7))]).await.unwrap();
        // Index 1 was never modified; it must still resolve under both trees.
        let before = empty.get_leaves::<TestLeaf>(&store, &[1], 4).await.unwrap();
        let after = updated.get_leaves::<TestLeaf>(&store, &[1], 4).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn out_of_range_index_is_rejected() {
        let store = MapStorage::new();
        let hasher = PedersenHasher;
        let empty = MerkleTree::empty_tree::<TestLeaf>(&store, &hasher, 2).await.unwrap();
        let result = empty.update(&store, &hasher, vec![(16, TestLeaf(1))]).await;
        assert_matches!(result, Err(TreeError::IndexOutOfRange(16)));
    }
}
