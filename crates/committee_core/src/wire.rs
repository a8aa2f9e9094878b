//! JSON wire shapes for a state update, matching the original's `IntAsHex` / `IntAsStr`
//! marshmallow fields: public keys and asset ids travel as hex strings, balances/amounts/indices
//! as decimal strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use starknet_types_core::felt::Felt;

use crate::errors::{CoreError, CoreResult};
use crate::order::OrderState;
use crate::position::{PositionAsset, PositionState};
use crate::registry::CommitteeObjectKind;
use crate::vault::VaultState;

mod hex_felt {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use starknet_types_core::felt::Felt;

    pub fn serialize<S: Serializer>(value: &Felt, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(value.to_bytes_be())))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Felt, D::Error> {
        let raw = String::deserialize(d)?;
        let trimmed = raw.strip_prefix("0x").unwrap_or(&raw);
        let bytes = hex::decode(trimmed).map_err(D::Error::custom)?;
        if bytes.len() > 32 {
            return Err(D::Error::custom("felt hex string longer than 32 bytes"));
        }
        let mut buf = [0u8; 32];
        buf[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(Felt::from_bytes_be(&buf))
    }
}

mod dec_u64 {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        String::deserialize(d)?.parse().map_err(D::Error::custom)
    }
}

mod dec_i64 {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        String::deserialize(d)?.parse().map_err(D::Error::custom)
    }
}

mod hex_u128_key {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{value:x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(d)?;
        let trimmed = raw.strip_prefix("0x").unwrap_or(&raw);
        u128::from_str_radix(trimmed, 16).map_err(D::Error::custom)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VaultWire {
    #[serde(with = "hex_felt")]
    pub stark_key: Felt,
    #[serde(with = "hex_felt")]
    pub token: Felt,
    #[serde(with = "dec_u64")]
    pub balance: u64,
}

impl TryFrom<VaultWire> for VaultState {
    type Error = CoreError;

    fn try_from(wire: VaultWire) -> CoreResult<Self> {
        VaultState::new(wire.stark_key, wire.token, wire.balance)
    }
}

impl From<VaultState> for VaultWire {
    fn from(vault: VaultState) -> Self {
        VaultWire { stark_key: vault.stark_key, token: vault.token, balance: vault.balance }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderWire {
    #[serde(with = "dec_u64")]
    pub fulfilled_amount: u64,
}

impl From<OrderWire> for OrderState {
    fn from(wire: OrderWire) -> Self {
        OrderState { fulfilled_amount: wire.fulfilled_amount }
    }
}

impl From<OrderState> for OrderWire {
    fn from(order: OrderState) -> Self {
        OrderWire { fulfilled_amount: order.fulfilled_amount }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PositionAssetWire {
    #[serde(with = "dec_i64")]
    pub balance: i64,
    #[serde(with = "dec_i64")]
    pub cached_funding_index: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PositionWire {
    #[serde(with = "hex_felt")]
    pub public_key: Felt,
    #[serde(with = "dec_i64")]
    pub collateral_balance: i64,
    #[serde(with = "position_assets")]
    pub assets: BTreeMap<u128, PositionAssetWire>,
}

mod position_assets {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{hex_u128_key, PositionAssetWire};

    #[derive(Serialize, Deserialize)]
    struct Keyed(#[serde(with = "hex_u128_key")] u128, PositionAssetWire);

    pub fn serialize<S: Serializer>(map: &BTreeMap<u128, PositionAssetWire>, s: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut out = s.serialize_map(Some(map.len()))?;
        for (k, v) in map {
            out.serialize_entry(&format!("0x{k:x}"), v)?;
        }
        out.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<u128, PositionAssetWire>, D::Error> {
        let raw: BTreeMap<String, PositionAssetWire> = BTreeMap::deserialize(d)?;
        raw.into_iter()
            .map(|(k, v)| {
                let trimmed = k.strip_prefix("0x").unwrap_or(&k);
                u128::from_str_radix(trimmed, 16).map(|id| (id, v)).map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

impl From<PositionWire> for PositionState {
    fn from(wire: PositionWire) -> Self {
        let assets = wire
            .assets
            .into_iter()
            .map(|(id, asset)| (id, PositionAsset { balance: asset.balance, cached_funding_index: asset.cached_funding_index }))
            .collect();
        PositionState { public_key: wire.public_key, collateral_balance: wire.collateral_balance, assets }
    }
}

impl From<PositionState> for PositionWire {
    fn from(position: PositionState) -> Self {
        let assets = position
            .assets
            .into_iter()
            .map(|(id, asset)| (id, PositionAssetWire { balance: asset.balance, cached_funding_index: asset.cached_funding_index }))
            .collect();
        PositionWire { public_key: position.public_key, collateral_balance: position.collateral_balance, assets }
    }
}

/// The state update payload for a single batch: the declared roots plus the new leaves for every
/// configured object. Both the StarkEx shape (`vault`/`order`[/`rollup_vault`]) and the perpetual
/// shape (`position`/`order`) are represented by the same struct; only the fields the operator's
/// committee configuration actually uses are populated.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StateUpdate {
    pub prev_batch_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vaults: Option<BTreeMap<u64, VaultWire>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orders: Option<BTreeMap<u64, OrderWire>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollup_vaults: Option<BTreeMap<u64, VaultWire>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions: Option<BTreeMap<u64, PositionWire>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollup_vault_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_root: Option<String>,
}

/// One named object's parsed modifications, in the leaf type its configured kind implies.
pub enum ObjectModifications {
    Vault(Vec<(u64, VaultState)>),
    Order(Vec<(u64, OrderState)>),
    Position(Vec<(u64, PositionState)>),
}

impl StateUpdate {
    /// Parses the modifications for a configured named object. `name` selects the wire field
    /// (`vault`/`order`/`rollup_vault`/`position`); an absent field yields an empty modification
    /// set, matching a batch that happens to touch none of that object's leaves.
    pub fn object_modifications(&self, name: &str, kind: CommitteeObjectKind) -> CoreResult<ObjectModifications> {
        match (name, kind) {
            ("vault", CommitteeObjectKind::Vault) => {
                let entries = self.vaults.clone().unwrap_or_default();
                let parsed =
                    entries.into_iter().map(|(i, w)| Ok((i, VaultState::try_from(w)?))).collect::<CoreResult<Vec<_>>>()?;
                Ok(ObjectModifications::Vault(parsed))
            }
            ("rollup_vault", CommitteeObjectKind::RollupVault) => {
                let entries = self.rollup_vaults.clone().unwrap_or_default();
                let parsed =
                    entries.into_iter().map(|(i, w)| Ok((i, VaultState::try_from(w)?))).collect::<CoreResult<Vec<_>>>()?;
                Ok(ObjectModifications::Vault(parsed))
            }
            ("order", CommitteeObjectKind::Order) => {
                let entries = self.orders.clone().unwrap_or_default();
                Ok(ObjectModifications::Order(entries.into_iter().map(|(i, w)| (i, w.into())).collect()))
            }
            ("position", CommitteeObjectKind::Position) => {
                let entries = self.positions.clone().unwrap_or_default();
                Ok(ObjectModifications::Position(entries.into_iter().map(|(i, w)| (i, w.into())).collect()))
            }
            (other, _) => Err(CoreError::UnknownObjectKind(other.to_string())),
        }
    }

    /// The operator's declared root (hex string, no `0x` prefix) for a configured named object.
    pub fn declared_root(&self, name: &str) -> Option<&str> {
        match name {
            "vault" => self.vault_root.as_deref(),
            "order" => self.order_root.as_deref(),
            "rollup_vault" => self.rollup_vault_root.as_deref(),
            "position" => self.position_root.as_deref(),
            _ => None,
        }
    }
}

/// The gateway's response to `get_batch_data`: `update` is `None` when the batch isn't ready yet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchDataResponse {
    pub update: Option<StateUpdate>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn vault_wire_round_trips_through_json() {
        let wire = VaultWire { stark_key: Felt::from(5u64), token: Felt::from(6u64), balance: 7 };
        let json = serde_json::to_string(&wire).unwrap();
        let parsed: VaultWire = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.balance, 7);
        assert_eq!(parsed.stark_key, Felt::from(5u64));
    }

    #[test]
    fn state_update_tolerates_missing_optional_fields() {
        let json = r#"{"prev_batch_id": -1, "orders": {}, "order_root": "00"}"#;
        let update: StateUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.prev_batch_id, -1);
        assert!(update.vaults.is_none());
    }

    #[test]
    fn object_modifications_selects_the_right_field() {
        let mut vaults = BTreeMap::new();
        vaults.insert(3u64, VaultWire { stark_key: Felt::from(1u64), token: Felt::from(2u64), balance: 9 });
        let update = StateUpdate { prev_batch_id: -1, vaults: Some(vaults), ..Default::default() };
        match update.object_modifications("vault", CommitteeObjectKind::Vault).unwrap() {
            ObjectModifications::Vault(entries) => assert_eq!(entries, vec![(3, VaultState::new(Felt::from(1u64), Felt::from(2u64), 9).unwrap())]),
            _ => panic!("expected vault modifications"),
        }
    }
}
