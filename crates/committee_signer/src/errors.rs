use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("failed to read private key file {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("private key file did not contain a valid hex-encoded secp256k1 key: {0}")]
    InvalidKey(String),
}

pub type SignerResult<T> = Result<T, SignerError>;
