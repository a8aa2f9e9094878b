//! A deterministic secp256k1 signer for the availability claim hash.

pub mod errors;
pub mod signer;

pub use errors::{SignerError, SignerResult};
pub use signer::{Address, RecoverableSignatureBytes, Secp256k1Signer, Signer};
