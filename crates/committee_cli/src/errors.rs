use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("malformed snapshot file {path}: {source}")]
    Snapshot { path: String, #[source] source: serde_json::Error },
    #[error("malformed hex in snapshot entry: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("malformed leaf JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Tree(#[from] committee_patricia::TreeError),
    #[error(transparent)]
    Core(#[from] committee_core::CoreError),
    #[error("'{0}' is not a valid root: expected 64 hex characters")]
    InvalidRoot(String),
    #[error("field '{field}' in row {row} is malformed: {message}")]
    MalformedField { row: usize, field: &'static str, message: String },
}

pub type CliResult<T> = Result<T, CliError>;
