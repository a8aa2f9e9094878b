use committee_patricia::TreeError;
use committee_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("balance {0} is negative or out of range")]
    BalanceOutOfRange(i128),
    #[error("fulfilled amount {0} is negative or out of range")]
    AmountOutOfRange(i128),
    #[error("vault does not match stark_key/token of the existing entry")]
    VaultMismatch,
    #[error("a non-empty vault cannot have an empty stark_key or token")]
    EmptyVaultKey,
    #[error("order is over fulfilled: {fulfilled} + {delta} > capacity {capacity}")]
    OrderOverfulfilled { fulfilled: u64, delta: u64, capacity: u64 },
    #[error("funding index for asset {0:#x} does not appear in state")]
    MissingFundingIndex(u128),
    #[error("unrecognized committee object kind: {0}")]
    UnknownObjectKind(String),
    #[error("no previous batch info found for batch id {0}")]
    MissingPrevBatchInfo(i64),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

pub type CoreResult<T> = Result<T, CoreError>;
