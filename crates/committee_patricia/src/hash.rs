use std::fmt;

use serde::{Deserialize, Serialize};
use starknet_types_core::felt::Felt;

/// A fixed-width, opaque identifier addressing every leaf and inner node in the fact store.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HashOutput(pub Felt);

impl HashOutput {
    pub fn to_bytes(self) -> [u8; 32] {
        self.0.to_bytes_be()
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(Felt::from_bytes_be(bytes))
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).ok()?;
        let mut buf = [0u8; 32];
        if bytes.len() > 32 {
            return None;
        }
        buf[32 - bytes.len()..].copy_from_slice(&bytes);
        Some(Self::from_bytes(&buf))
    }
}

impl fmt::Debug for HashOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashOutput(0x{})", self.to_hex())
    }
}

impl fmt::Display for HashOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

/// A collision-resistant 2-ary hash over two `HashOutput`s. Pluggable so tests can swap in a
/// cheap mock; the production default is Pedersen, matching the original commitment scheme.
pub trait Hasher: Send + Sync {
    fn hash(&self, left: &HashOutput, right: &HashOutput) -> HashOutput;
}

/// Default production hasher: Starknet's Pedersen hash over the two felts.
#[derive(Clone, Copy, Default)]
pub struct PedersenHasher;

impl Hasher for PedersenHasher {
    fn hash(&self, left: &HashOutput, right: &HashOutput) -> HashOutput {
        HashOutput(starknet_crypto::pedersen_hash(&left.0, &right.0))
    }
}
