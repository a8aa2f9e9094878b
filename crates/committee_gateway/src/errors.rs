use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("gateway returned non-success status: {0}")]
    BadStatus(StatusCode),
    #[error("gateway response body was not the expected shape: {0}")]
    InvalidResponse(String),
    #[error("exhausted the retry budget ({attempts} attempts) calling {endpoint}")]
    TooManyAttempts { endpoint: &'static str, attempts: u32 },
    #[error("failed to build mTLS client identity: {0}")]
    Tls(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
