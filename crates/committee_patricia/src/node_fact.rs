use committee_storage::Storage;

use crate::errors::{TreeError, TreeResult};
use crate::hash::{HashOutput, Hasher};

/// An inner Merkle node: the pair of hashes of its two children.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MerkleNodeFact {
    pub left: HashOutput,
    pub right: HashOutput,
}

impl MerkleNodeFact {
    pub fn hash(&self, hasher: &dyn Hasher) -> HashOutput {
        hasher.hash(&self.left, &self.right)
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        out.extend_from_slice(&self.left.to_bytes());
        out.extend_from_slice(&self.right.to_bytes());
        out
    }

    pub fn deserialize(bytes: &[u8]) -> TreeResult<Self> {
        if bytes.len() != 64 {
            return Err(TreeError::MalformedNodeFact(bytes.len()));
        }
        let mut left = [0u8; 32];
        let mut right = [0u8; 32];
        left.copy_from_slice(&bytes[..32]);
        right.copy_from_slice(&bytes[32..]);
        Ok(Self { left: HashOutput::from_bytes(&left), right: HashOutput::from_bytes(&right) })
    }
}

fn node_key(hash: &HashOutput) -> Vec<u8> {
    format!("merkle_node:{}", hash.to_hex()).into_bytes()
}

pub async fn write_node_fact(
    store: &dyn Storage,
    hasher: &dyn Hasher,
    fact: &MerkleNodeFact,
) -> TreeResult<HashOutput> {
    let hash = fact.hash(hasher);
    store.set(node_key(&hash), fact.serialize()).await?;
    Ok(hash)
}

pub async fn read_node_fact(store: &dyn Storage, hash: &HashOutput) -> TreeResult<MerkleNodeFact> {
    let bytes = store
        .get(&node_key(hash))
        .await?
        .ok_or_else(|| TreeError::MissingNode(hash.to_hex()))?;
    MerkleNodeFact::deserialize(&bytes)
}
