use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Which domain leaf type a configured named tree holds, resolved once at startup from the
/// configuration's `kind` string. Replaces dynamic class-by-path loading with an exhaustively
/// matchable enum: an unrecognized `kind` is a config-load error, not a runtime import failure.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum CommitteeObjectKind {
    Vault,
    Order,
    Position,
    RollupVault,
}

impl CommitteeObjectKind {
    /// Which slot, if any, this object fills in the signed availability claim. Exactly one of
    /// `Vault`/`Position` may claim the vaults slot, `Order` always claims the trades slot, and
    /// `RollupVault` is tracked but excluded — its data is already available on-chain.
    pub fn claim_role(self) -> ClaimRole {
        match self {
            CommitteeObjectKind::Vault | CommitteeObjectKind::Position => ClaimRole::Vaults,
            CommitteeObjectKind::Order => ClaimRole::Trades,
            CommitteeObjectKind::RollupVault => ClaimRole::Excluded,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClaimRole {
    Vaults,
    Trades,
    Excluded,
}

impl fmt::Display for CommitteeObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommitteeObjectKind::Vault => "vault",
            CommitteeObjectKind::Order => "order",
            CommitteeObjectKind::Position => "position",
            CommitteeObjectKind::RollupVault => "rollup_vault",
        })
    }
}

impl FromStr for CommitteeObjectKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vault" => Ok(CommitteeObjectKind::Vault),
            "order" => Ok(CommitteeObjectKind::Order),
            "position" => Ok(CommitteeObjectKind::Position),
            "rollup_vault" => Ok(CommitteeObjectKind::RollupVault),
            other => Err(CoreError::UnknownObjectKind(other.to_string())),
        }
    }
}

/// One configured named tree: its wire/storage name, its leaf kind, and its Merkle height.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct CommitteeObjectConfig {
    pub name: String,
    pub kind: CommitteeObjectKind,
    pub merkle_height: u32,
}
