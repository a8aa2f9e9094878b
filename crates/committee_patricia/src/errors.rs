use committee_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("leaf index {0} is out of range for this tree's height")]
    IndexOutOfRange(u64),
    #[error("a leaf (height 0) node has no children")]
    LeafHasNoChildren,
    #[error("missing node fact for hash {0}")]
    MissingNode(String),
    #[error("missing leaf fact for hash {0}")]
    MissingLeaf(String),
    #[error("malformed node fact: expected 64 bytes, got {0}")]
    MalformedNodeFact(usize),
    #[error("malformed leaf fact: {0}")]
    MalformedLeafFact(String),
    #[error("traversal callback failed: {0}")]
    Traversal(String),
}

pub type TreeResult<T> = Result<T, TreeError>;
