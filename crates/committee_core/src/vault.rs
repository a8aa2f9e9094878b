use committee_patricia::{HashOutput, Hasher, LeafFact, TreeError, TreeResult};
use serde::{Deserialize, Serialize};
use starknet_types_core::felt::Felt;

use crate::errors::{CoreError, CoreResult};

/// The amount range used throughout the StarkEx object model: balances and fulfilled amounts
/// live in `[0, MAX_AMOUNT)`.
pub const MAX_AMOUNT: u64 = 1 << 63;

/// An update applied to a single vault: the caller-asserted owner/token (checked against the
/// vault's current contents when it is non-empty) and the signed balance delta.
#[derive(Clone, Copy, Debug)]
pub struct VaultUpdateData {
    pub vault_id: u64,
    pub stark_key: Felt,
    pub token: Felt,
    pub diff: i64,
}

/// A single vault's contents: owner, token and balance. The canonical empty vault has all three
/// fields zero; a non-empty vault must have both `stark_key` and `token` set.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct VaultState {
    pub stark_key: Felt,
    pub token: Felt,
    pub balance: u64,
}

impl VaultState {
    /// Constructs a vault, normalizing a zero balance to a zero key/token and rejecting a
    /// non-zero balance paired with an empty key or token.
    pub fn new(stark_key: Felt, token: Felt, balance: u64) -> CoreResult<Self> {
        if balance >= MAX_AMOUNT {
            return Err(CoreError::BalanceOutOfRange(balance as i128));
        }
        if balance == 0 {
            return Ok(Self { stark_key: Felt::ZERO, token: Felt::ZERO, balance: 0 });
        }
        if stark_key == Felt::ZERO || token == Felt::ZERO {
            return Err(CoreError::EmptyVaultKey);
        }
        Ok(Self { stark_key, token, balance })
    }

    pub fn empty() -> Self {
        Self { stark_key: Felt::ZERO, token: Felt::ZERO, balance: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.stark_key == Felt::ZERO && self.token == Felt::ZERO && self.balance == 0
    }

    /// Applies `change` to this vault, asserting `stark_key`/`token` continuity for a non-empty
    /// vault, and keeping the resulting balance within `[0, MAX_AMOUNT)`.
    pub fn add(&self, change: VaultUpdateData) -> CoreResult<VaultState> {
        if self.balance > 0 {
            if self.stark_key != change.stark_key || self.token != change.token {
                return Err(CoreError::VaultMismatch);
            }
        }
        let new_balance = self.balance as i128 + change.diff as i128;
        if new_balance < 0 || new_balance >= MAX_AMOUNT as i128 {
            return Err(CoreError::BalanceOutOfRange(new_balance));
        }
        VaultState::new(change.stark_key, change.token, new_balance as u64)
    }
}

impl LeafFact for VaultState {
    fn empty() -> Self {
        VaultState::empty()
    }

    fn is_empty(&self) -> bool {
        VaultState::is_empty(self)
    }

    fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(72);
        bytes.extend_from_slice(&self.stark_key.to_bytes_be());
        bytes.extend_from_slice(&self.token.to_bytes_be());
        bytes.extend_from_slice(&self.balance.to_be_bytes());
        bytes
    }

    fn deserialize(bytes: &[u8]) -> TreeResult<Self> {
        if bytes.len() != 72 {
            return Err(TreeError::MalformedLeafFact(format!(
                "vault leaf: expected 72 bytes, got {}",
                bytes.len()
            )));
        }
        let stark_key = Felt::from_bytes_be(bytes[0..32].try_into().expect("32 bytes"));
        let token = Felt::from_bytes_be(bytes[32..64].try_into().expect("32 bytes"));
        let balance = u64::from_be_bytes(bytes[64..72].try_into().expect("8 bytes"));
        Ok(Self { stark_key, token, balance })
    }

    fn hash(&self, hasher: &dyn Hasher) -> HashOutput {
        let stark_key = HashOutput(self.stark_key);
        let token = HashOutput(self.token);
        let balance = felt_hash_output(self.balance);
        hasher.hash(&hasher.hash(&stark_key, &token), &balance)
    }

    fn prefix() -> &'static [u8] {
        b"vault"
    }
}

/// Packs a non-negative integer into the low bytes of a 32-byte big-endian felt, matching the
/// original's `to_bytes(value)` used as a hash input.
pub(crate) fn felt_hash_output(value: u64) -> HashOutput {
    let mut bytes = [0u8; 32];
    bytes[24..].copy_from_slice(&value.to_be_bytes());
    HashOutput::from_bytes(&bytes)
}
