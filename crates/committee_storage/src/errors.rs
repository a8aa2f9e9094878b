use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage operation timed out after {0} attempts")]
    TooManyAttempts(usize),
    #[error("record too big for storage: key={key:?}, size={size}B")]
    RecordTooBig { key: Vec<u8>, size: usize },
    #[error("stored integer at key {0:?} is not valid decimal")]
    InvalidInt(Vec<u8>),
    #[error("backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
