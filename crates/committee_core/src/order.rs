use committee_patricia::{HashOutput, Hasher, LeafFact, TreeError, TreeResult};
use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult};
use crate::vault::{felt_hash_output, MAX_AMOUNT};

/// How much of an order has been fulfilled so far. Unlike `VaultState`, the leaf hash is the
/// amount's felt encoding directly — there is no second field to combine it with.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct OrderState {
    pub fulfilled_amount: u64,
}

impl OrderState {
    pub fn empty() -> Self {
        Self { fulfilled_amount: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.fulfilled_amount == 0
    }

    /// Adds `delta` to the fulfilled amount, rejecting a negative delta or one that would push
    /// the order past `capacity`.
    pub fn add(&self, delta: u64, capacity: u64) -> CoreResult<OrderState> {
        let new_amount = self.fulfilled_amount + delta;
        if new_amount > capacity {
            return Err(CoreError::OrderOverfulfilled { fulfilled: self.fulfilled_amount, delta, capacity });
        }
        Ok(OrderState { fulfilled_amount: new_amount })
    }
}

impl LeafFact for OrderState {
    fn empty() -> Self {
        OrderState::empty()
    }

    fn is_empty(&self) -> bool {
        OrderState::is_empty(self)
    }

    fn serialize(&self) -> Vec<u8> {
        self.fulfilled_amount.to_be_bytes().to_vec()
    }

    fn deserialize(bytes: &[u8]) -> TreeResult<Self> {
        if bytes.len() != 8 {
            return Err(TreeError::MalformedLeafFact(format!(
                "order leaf: expected 8 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self { fulfilled_amount: u64::from_be_bytes(bytes.try_into().expect("8 bytes")) })
    }

    fn hash(&self, _hasher: &dyn Hasher) -> HashOutput {
        felt_hash_output(self.fulfilled_amount)
    }

    fn prefix() -> &'static [u8] {
        b"order"
    }
}

/// `0 <= fulfilled_amount < MAX_AMOUNT`, matching the original's order amount range.
pub fn validate_fulfilled_amount(amount: u64) -> CoreResult<()> {
    if amount >= MAX_AMOUNT {
        return Err(CoreError::AmountOutOfRange(amount as i128));
    }
    Ok(())
}
