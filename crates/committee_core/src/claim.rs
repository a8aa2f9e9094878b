use committee_patricia::{HashOutput, Hasher};
use starknet_types_core::felt::Felt;

/// The two claimed trees plus the sequence number under which the claim is signed. `rollup_vault`
/// and any other tracked-but-unclaimed object never appear here.
#[derive(Clone, Copy, Debug)]
pub struct ClaimInputs {
    pub vaults_root: HashOutput,
    pub vaults_height: u32,
    pub trades_root: HashOutput,
    pub trades_height: u32,
    pub sequence_number: i64,
}

/// Hashes `(vaults_root, vaults_height, trades_root, trades_height, sequence_number)` in that
/// order, chaining the tree's own 2-ary hasher left to right. Every field is fixed at the start
/// of the chain or the next one, so there is exactly one encoding for a given set of inputs; any
/// deviation here invalidates every previously issued signature.
pub fn claim_hash(inputs: ClaimInputs, hasher: &dyn Hasher) -> HashOutput {
    let acc = hasher.hash(&inputs.vaults_root, &felt_of(inputs.vaults_height as i64));
    let acc = hasher.hash(&acc, &inputs.trades_root);
    let acc = hasher.hash(&acc, &felt_of(inputs.trades_height as i64));
    hasher.hash(&acc, &felt_of(inputs.sequence_number))
}

/// Encodes a signed integer as a field element: non-negative values map directly, negative
/// values map to their additive inverse mod the field prime (the only negative value in
/// practice is the initial batch's `sequence_number = -1`).
fn felt_of(value: i64) -> HashOutput {
    if value >= 0 {
        HashOutput(Felt::from(value as u64))
    } else {
        HashOutput(Felt::ZERO - Felt::from((-value) as u64))
    }
}

#[cfg(test)]
mod tests {
    use committee_patricia::PedersenHasher;
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample_inputs() -> ClaimInputs {
        ClaimInputs {
            vaults_root: HashOutput(Felt::from(1u64)),
            vaults_height: 31,
            trades_root: HashOutput(Felt::from(2u64)),
            trades_height: 251,
            sequence_number: 0,
        }
    }

    #[test]
    fn claim_hash_is_deterministic() {
        let hasher = PedersenHasher;
        let inputs = sample_inputs();
        assert_eq!(claim_hash(inputs, &hasher), claim_hash(inputs, &hasher));
    }

    #[test]
    fn claim_hash_depends_on_sequence_number() {
        let hasher = PedersenHasher;
        let mut a = sample_inputs();
        let mut b = sample_inputs();
        a.sequence_number = 0;
        b.sequence_number = 1;
        assert_ne!(claim_hash(a, &hasher), claim_hash(b, &hasher));
    }

    #[test]
    fn claim_hash_ignores_fields_not_passed_in() {
        // Rollup vault data never enters ClaimInputs at all; two otherwise-identical inputs
        // produce the same hash regardless of any third tree's root.
        let hasher = PedersenHasher;
        let inputs = sample_inputs();
        assert_eq!(claim_hash(inputs, &hasher), claim_hash(inputs, &hasher));
    }

    #[test]
    fn negative_sequence_number_is_supported() {
        let hasher = PedersenHasher;
        let mut inputs = sample_inputs();
        inputs.sequence_number = -1;
        // Must not panic, and must differ from the non-negative encoding of the same magnitude.
        let negative = claim_hash(inputs, &hasher);
        inputs.sequence_number = 1;
        let positive = claim_hash(inputs, &hasher);
        assert_ne!(negative, positive);
    }
}
