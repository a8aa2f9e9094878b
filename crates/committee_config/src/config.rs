use std::path::{Path, PathBuf};

use committee_core::{CommitteeObjectConfig, CommitteeObjectKind};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{ConfigError, ConfigResult};

/// The committee's full runtime configuration. Every field has a default matching the original
/// `CommitteeConfig` dataclass; `Default` plus `#[serde(default)]` means a config file only needs
/// to mention the fields it wants to override.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CommitteeConfig {
    #[validate(url)]
    pub availability_gateway_endpoint: String,

    #[validate(range(min = 0.0))]
    pub polling_interval: f64,

    pub validate_orders: bool,

    /// `None` means "old API version, no rollup tree configured" — legal only when
    /// `committee_objects` has no `rollup_vault` entry; enforced in [`CommitteeConfig::validate_all`].
    pub validate_rollup: Option<bool>,

    pub dump_batch: bool,

    pub committee_objects: Vec<CommitteeObjectConfig>,

    pub fact_storage_cache_size: usize,

    pub private_key_path: PathBuf,

    pub http_request_timeout: u64,

    pub certificates_path: Option<PathBuf>,

    /// The traversal driver's bounded-parallelism cap, shared by every `update`/`get_leaves` call.
    pub n_workers: usize,

    /// A `tracing_subscriber::EnvFilter` directive; overridden by `RUST_LOG` if set.
    pub log_level: String,
}

impl Default for CommitteeConfig {
    fn default() -> Self {
        Self {
            availability_gateway_endpoint: String::new(),
            polling_interval: 1.0,
            validate_orders: false,
            validate_rollup: None,
            dump_batch: false,
            committee_objects: Vec::new(),
            fact_storage_cache_size: 65536,
            private_key_path: PathBuf::from("/private_key.txt"),
            http_request_timeout: 300,
            certificates_path: None,
            n_workers: 8,
            log_level: "info".to_string(),
        }
    }
}

impl CommitteeConfig {
    /// Loads a config from a TOML file, falling back to `Default::default()` for any field the
    /// file omits. Does not validate and does not apply environment or CLI overlays — callers
    /// must run those overlays first and validate the final result once; see `committee_config::load`.
    pub fn from_toml_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Toml { path: path.to_path_buf(), source })?;
        Ok(config)
    }

    /// Field-level `validator` checks plus the one cross-field invariant the derive can't express:
    /// a configured `rollup_vault` object requires an explicit `validate_rollup`.
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.validate()?;
        if !self.private_key_path.is_absolute() {
            return Err(ConfigError::PrivateKeyPathNotAbsolute(self.private_key_path.clone()));
        }
        let has_rollup_vault = self.committee_objects.iter().any(|o| o.kind == CommitteeObjectKind::RollupVault);
        if has_rollup_vault && self.validate_rollup.is_none() {
            return Err(ConfigError::RollupVaultRequiresValidateRollup);
        }
        Ok(())
    }
}
