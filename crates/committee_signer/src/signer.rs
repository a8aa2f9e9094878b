use async_trait::async_trait;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};

use crate::errors::{SignerError, SignerResult};

/// A 65-byte recoverable ECDSA signature: `r (32) || s (32) || recovery_id (1)`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RecoverableSignatureBytes(pub [u8; 65]);

impl RecoverableSignatureBytes {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// A 20-byte Ethereum-style account address derived from a secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

/// Anything that can produce a deterministic recoverable signature over a 32-byte digest and
/// report the address it signs under.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, digest: &[u8; 32]) -> RecoverableSignatureBytes;
    fn address(&self) -> Address;
}

/// Loads a secp256k1 private key once from a file (trailing newline stripped, hex-decoded) and
/// signs with RFC 6979 deterministic nonce generation — the `secp256k1` crate's default
/// `sign_ecdsa_recoverable` behavior. The key is held only in this struct's memory; it is never
/// written back out.
pub struct Secp256k1Signer {
    secret_key: SecretKey,
    address: Address,
}

impl Secp256k1Signer {
    pub fn from_file(path: &std::path::Path) -> SignerResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| SignerError::Io { path: path.display().to_string(), source })?;
        Self::from_hex(contents.trim())
    }

    pub fn from_hex(hex_key: &str) -> SignerResult<Self> {
        let trimmed = hex_key.strip_prefix("0x").unwrap_or(hex_key);
        let bytes = hex::decode(trimmed).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        let secret_key = SecretKey::from_slice(&bytes).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        let public_key = PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret_key);
        Ok(Self { secret_key, address: address_from_public_key(&public_key) })
    }
}

/// Keccak-256 of the 64-byte uncompressed public key (X || Y, no `0x04` prefix), last 20 bytes —
/// the same derivation `eth.Account` uses for an address.
fn address_from_public_key(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    let digest = Keccak256::digest(&uncompressed[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[12..32]);
    Address(address)
}

#[async_trait]
impl Signer for Secp256k1Signer {
    async fn sign(&self, digest: &[u8; 32]) -> RecoverableSignatureBytes {
        let secp = Secp256k1::signing_only();
        let message = Message::from_digest(*digest);
        let signature: RecoverableSignature = secp.sign_ecdsa_recoverable(&message, &self.secret_key);
        let (recovery_id, compact) = signature.serialize_compact();
        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&compact);
        bytes[64] = recovery_id_to_byte(recovery_id);
        RecoverableSignatureBytes(bytes)
    }

    fn address(&self) -> Address {
        self.address
    }
}

fn recovery_id_to_byte(id: RecoveryId) -> u8 {
    i32::from(id) as u8
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const TEST_KEY_HEX: &str = "4646464646464646464646464646464646464646464646464646464646464";

    #[tokio::test]
    async fn signing_is_deterministic() {
        let signer = Secp256k1Signer::from_hex(TEST_KEY_HEX).unwrap();
        let digest = [7u8; 32];
        let a = signer.sign(&digest).await;
        let b = signer.sign(&digest).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn different_digests_sign_differently() {
        let signer = Secp256k1Signer::from_hex(TEST_KEY_HEX).unwrap();
        let a = signer.sign(&[1u8; 32]).await;
        let b = signer.sign(&[2u8; 32]).await;
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!(Secp256k1Signer::from_hex("not hex").is_err());
    }

    #[test]
    fn strips_0x_prefix() {
        let with_prefix = Secp256k1Signer::from_hex(&format!("0x{TEST_KEY_HEX}")).unwrap();
        let without_prefix = Secp256k1Signer::from_hex(TEST_KEY_HEX).unwrap();
        assert_eq!(with_prefix.address(), without_prefix.address());
    }
}
