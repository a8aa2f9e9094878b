use crate::errors::TreeResult;
use crate::hash::{HashOutput, Hasher};

/// A domain object living at height 0 of a Merkle tree.
pub trait LeafFact: Clone + PartialEq + Send + Sync + 'static {
    /// The canonical zero leaf for this type.
    fn empty() -> Self;

    /// Whether `self` equals `Self::empty()`. Kept as a separate method (rather than requiring
    /// `PartialEq` at call sites) because some leaf types have a cheaper emptiness check than a
    /// full structural comparison.
    fn is_empty(&self) -> bool;

    fn serialize(&self) -> Vec<u8>;

    fn deserialize(bytes: &[u8]) -> TreeResult<Self>
    where
        Self: Sized;

    fn hash(&self, hasher: &dyn Hasher) -> HashOutput;

    /// The fact-store key namespace this leaf type is persisted under.
    fn prefix() -> &'static [u8];
}

pub fn leaf_key<L: LeafFact>(hash: &HashOutput) -> Vec<u8> {
    let mut key = L::prefix().to_vec();
    key.push(b':');
    key.extend_from_slice(hash.to_hex().as_bytes());
    key
}
