//! Domain leaf types (vault, order, position), the static named-object registry, batch info
//! persistence with legacy-key migration, and the deterministic claim hasher.

pub mod batch_info;
pub mod claim;
pub mod errors;
pub mod order;
pub mod position;
pub mod registry;
pub mod vault;
pub mod wire;

pub use batch_info::{
    compute_initial_batch_info, empty_root_for_kind, read_batch_info, read_next_batch_id, write_batch_info,
    write_next_batch_id, CommitteeBatchInfo,
};
pub use claim::{claim_hash, ClaimInputs};
pub use errors::{CoreError, CoreResult};
pub use order::OrderState;
pub use position::{PositionAsset, PositionState};
pub use registry::{ClaimRole, CommitteeObjectConfig, CommitteeObjectKind};
pub use vault::{VaultState, VaultUpdateData, MAX_AMOUNT};
pub use wire::{BatchDataResponse, ObjectModifications, OrderWire, PositionWire, StateUpdate, VaultWire};
