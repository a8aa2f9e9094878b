use std::collections::BTreeMap;

use committee_patricia::{HashOutput, Hasher, LeafFact, TreeError, TreeResult};
use serde::{Deserialize, Serialize};
use starknet_types_core::felt::Felt;

const BALANCE_LOWER_BOUND: i64 = i64::MIN;
const N_ASSETS_UPPER_BOUND: u64 = 1 << 16;
const FUNDING_INDEX_LOWER_BOUND: i64 = i64::MIN;

/// A single synthetic asset held within a position: a signed balance and the funding index it
/// was last settled against.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PositionAsset {
    pub balance: i64,
    pub cached_funding_index: i64,
}

impl PositionAsset {
    /// Packs `(asset_id, cached_funding_index, balance)` into a single felt, the message hashed
    /// into a position's `assets_hash` chain. The packing only produces a value below the field
    /// prime because every input range is bounded accordingly.
    fn calculate_message(&self, asset_id: u128) -> HashOutput {
        let funding_index_range_size = Felt::from(1u128 << 64);
        let balance_range_size = Felt::from(1u128 << 64);

        let shifted_funding_index = (self.cached_funding_index as i128 - FUNDING_INDEX_LOWER_BOUND as i128) as u128;
        let shifted_balance = (self.balance as i128 - BALANCE_LOWER_BOUND as i128) as u128;

        let mut packed = Felt::from(asset_id) * funding_index_range_size + Felt::from(shifted_funding_index);
        packed = packed * balance_range_size + Felt::from(shifted_balance);
        HashOutput(packed)
    }
}

/// Position state: owner, collateral balance, and the synthetic assets held against it.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct PositionState {
    pub public_key: Felt,
    pub collateral_balance: i64,
    pub assets: BTreeMap<u128, PositionAsset>,
}

impl PositionState {
    pub fn empty() -> Self {
        Self { public_key: Felt::ZERO, collateral_balance: 0, assets: BTreeMap::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.public_key == Felt::ZERO && self.collateral_balance == 0 && self.assets.is_empty()
    }
}

impl LeafFact for PositionState {
    fn empty() -> Self {
        PositionState::empty()
    }

    fn is_empty(&self) -> bool {
        PositionState::is_empty(self)
    }

    fn serialize(&self) -> Vec<u8> {
        // A simple length-prefixed encoding: public_key, collateral_balance, then each asset
        // entry as (asset_id, balance, cached_funding_index), sorted by asset id for determinism.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.public_key.to_bytes_be());
        bytes.extend_from_slice(&self.collateral_balance.to_be_bytes());
        bytes.extend_from_slice(&(self.assets.len() as u32).to_be_bytes());
        for (asset_id, asset) in &self.assets {
            bytes.extend_from_slice(&asset_id.to_be_bytes());
            bytes.extend_from_slice(&asset.balance.to_be_bytes());
            bytes.extend_from_slice(&asset.cached_funding_index.to_be_bytes());
        }
        bytes
    }

    fn deserialize(bytes: &[u8]) -> TreeResult<Self> {
        let malformed = || TreeError::MalformedLeafFact("position leaf: truncated".to_string());
        if bytes.len() < 32 + 8 + 4 {
            return Err(malformed());
        }
        let public_key = Felt::from_bytes_be(bytes[0..32].try_into().expect("32 bytes"));
        let collateral_balance = i64::from_be_bytes(bytes[32..40].try_into().expect("8 bytes"));
        let count = u32::from_be_bytes(bytes[40..44].try_into().expect("4 bytes")) as usize;
        let mut offset = 44;
        let mut assets = BTreeMap::new();
        for _ in 0..count {
            if bytes.len() < offset + 16 + 8 + 8 {
                return Err(malformed());
            }
            let asset_id = u128::from_be_bytes(bytes[offset..offset + 16].try_into().expect("16 bytes"));
            offset += 16;
            let balance = i64::from_be_bytes(bytes[offset..offset + 8].try_into().expect("8 bytes"));
            offset += 8;
            let cached_funding_index = i64::from_be_bytes(bytes[offset..offset + 8].try_into().expect("8 bytes"));
            offset += 8;
            assets.insert(asset_id, PositionAsset { balance, cached_funding_index });
        }
        Ok(Self { public_key, collateral_balance, assets })
    }

    fn hash(&self, hasher: &dyn Hasher) -> HashOutput {
        let mut assets_hash = HashOutput::from_bytes(&[0u8; 32]);
        for (asset_id, asset) in &self.assets {
            assets_hash = hasher.hash(&assets_hash, &asset.calculate_message(*asset_id));
        }

        let shifted_balance = (self.collateral_balance as i128 - BALANCE_LOWER_BOUND as i128) as u128;
        let position_packed =
            Felt::from(shifted_balance) * Felt::from(N_ASSETS_UPPER_BOUND) + Felt::from(self.assets.len() as u64);

        hasher.hash(&hasher.hash(&assets_hash, &HashOutput(self.public_key)), &HashOutput(position_packed))
    }

    fn prefix() -> &'static [u8] {
        b"position"
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use committee_patricia::PedersenHasher;

    #[test]
    fn empty_position_is_canonical() {
        assert!(PositionState::empty().is_empty());
    }

    #[test]
    fn serialize_round_trips_with_assets() {
        let mut assets = BTreeMap::new();
        assets.insert(7u128, PositionAsset { balance: 100, cached_funding_index: -5 });
        let position = PositionState { public_key: Felt::from(42u64), collateral_balance: -10, assets };
        assert_eq!(PositionState::deserialize(&position.serialize()).unwrap(), position);
    }

    #[test]
    fn hash_is_deterministic_and_order_independent_of_insertion() {
        let hasher = PedersenHasher;
        let mut assets_a = BTreeMap::new();
        assets_a.insert(1u128, PositionAsset { balance: 10, cached_funding_index: 1 });
        assets_a.insert(2u128, PositionAsset { balance: 20, cached_funding_index: 2 });
        let a = PositionState { public_key: Felt::from(1u64), collateral_balance: 5, assets: assets_a };

        let mut assets_b = BTreeMap::new();
        assets_b.insert(2u128, PositionAsset { balance: 20, cached_funding_index: 2 });
        assets_b.insert(1u128, PositionAsset { balance: 10, cached_funding_index: 1 });
        let b = PositionState { public_key: Felt::from(1u64), collateral_balance: 5, assets: assets_b };

        assert_eq!(a.hash(&hasher), b.hash(&hasher));
    }
}
