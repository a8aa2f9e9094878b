use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use committee_storage::Storage;

use crate::errors::TreeResult;
use crate::hash::{HashOutput, Hasher};
use crate::leaf::{leaf_key, LeafFact};
use crate::node_fact::{write_node_fact, MerkleNodeFact};
use crate::tree::MerkleTree;

/// The plan half of an update: which hashes must be recomputed, expressed as a value rather than
/// interleaved with the I/O that computes them. A `Constant` leaf means the subtree underneath
/// carries no modification in this batch and its existing root is reused untouched.
pub enum Calculation<L> {
    Constant(HashOutput),
    Leaf(L),
    Binary(Box<Calculation<L>>, Box<Calculation<L>>),
}

impl<L> Calculation<L> {
    pub fn combine(left: Calculation<L>, right: Calculation<L>) -> Calculation<L> {
        Calculation::Binary(Box::new(left), Box::new(right))
    }
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Walks `tree` down to the dirty frontier implied by `modifications`, building a `Calculation`.
/// `leaf_offset` is the absolute index of the leftmost leaf under `tree`.
pub fn plan_update<'a, L: LeafFact>(
    store: &'a dyn Storage,
    tree: MerkleTree,
    leaf_offset: u64,
    modifications: &'a BTreeMap<u64, L>,
) -> BoxFuture<'a, TreeResult<Calculation<L>>> {
    Box::pin(async move {
        let range_size = 1u64 << tree.height;
        let has_modification = modifications.range(leaf_offset..leaf_offset + range_size).next().is_some();
        if !has_modification {
            return Ok(Calculation::Constant(tree.root));
        }
        if tree.height == 0 {
            let leaf = modifications
                .get(&leaf_offset)
                .expect("has_modification at height 0 implies this exact index is present")
                .clone();
            return Ok(Calculation::Leaf(leaf));
        }
        let (left_tree, right_tree) = tree.get_children(store).await?;
        let mid = leaf_offset + range_size / 2;
        let left = plan_update(store, left_tree, leaf_offset, modifications).await?;
        let right = plan_update(store, right_tree, mid, modifications).await?;
        Ok(Calculation::combine(left, right))
    })
}

/// Evaluates a `Calculation` bottom-up, writing every newly synthesized leaf and inner-node fact
/// before returning its hash. Independent subtrees are evaluated concurrently.
pub fn evaluate<'a, L: LeafFact>(
    calculation: Calculation<L>,
    store: &'a dyn Storage,
    hasher: &'a dyn Hasher,
) -> BoxFuture<'a, TreeResult<HashOutput>> {
    Box::pin(async move {
        match calculation {
            Calculation::Constant(hash) => Ok(hash),
            Calculation::Leaf(leaf) => {
                let hash = leaf.hash(hasher);
                store.set(leaf_key::<L>(&hash), leaf.serialize()).await?;
                Ok(hash)
            }
            Calculation::Binary(left, right) => {
                let (left_hash, right_hash) =
                    futures::try_join!(evaluate(*left, store, hasher), evaluate(*right, store, hasher))?;
                write_node_fact(store, hasher, &MerkleNodeFact { left: left_hash, right: right_hash }).await
            }
        }
    })
}
