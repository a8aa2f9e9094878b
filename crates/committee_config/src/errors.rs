use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Toml { path: PathBuf, #[source] source: toml::de::Error },
    #[error("config validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("private_key_path must be an absolute path, got {0}")]
    PrivateKeyPathNotAbsolute(PathBuf),
    #[error(
        "validate_rollup must be set to true or false when a rollup_vault object is configured \
         (null means \"no rollup tree configured\", an old-API-version sentinel)"
    )]
    RollupVaultRequiresValidateRollup,
    #[error("invalid override for {field}: {message}")]
    InvalidOverride { field: &'static str, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
