use std::path::PathBuf;

use clap::Args;

/// CLI overrides for the subset of `CommitteeConfig` fields an operator commonly tweaks per run.
/// Applied after the config file and environment overlays, matching `apollo_config`'s
/// file-then-env-then-CLI precedence.
#[derive(Args, Clone, Debug, Default)]
pub struct ConfigOverrides {
    #[arg(long)]
    pub availability_gateway_endpoint: Option<String>,

    #[arg(long)]
    pub polling_interval: Option<f64>,

    #[arg(long)]
    pub validate_orders: Option<bool>,

    #[arg(long)]
    pub fact_storage_cache_size: Option<usize>,

    #[arg(long)]
    pub private_key_path: Option<PathBuf>,

    #[arg(long)]
    pub n_workers: Option<usize>,

    #[arg(long)]
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut crate::config::CommitteeConfig) {
        if let Some(v) = &self.availability_gateway_endpoint {
            config.availability_gateway_endpoint = v.clone();
        }
        if let Some(v) = self.polling_interval {
            config.polling_interval = v;
        }
        if let Some(v) = self.validate_orders {
            config.validate_orders = v;
        }
        if let Some(v) = self.fact_storage_cache_size {
            config.fact_storage_cache_size = v;
        }
        if let Some(v) = &self.private_key_path {
            config.private_key_path = v.clone();
        }
        if let Some(v) = self.n_workers {
            config.n_workers = v;
        }
        if let Some(v) = &self.log_level {
            config.log_level = v.clone();
        }
    }
}

/// Applies a fixed set of `COMMITTEE_*` environment variables on top of the file-loaded config,
/// plus `RUST_LOG` for the log-level field specifically (it takes priority over
/// `COMMITTEE_LOG_LEVEL`, matching `tracing_subscriber::EnvFilter`'s own convention).
pub fn apply_env_overrides(config: &mut crate::config::CommitteeConfig) {
    if let Ok(v) = std::env::var("COMMITTEE_AVAILABILITY_GATEWAY_ENDPOINT") {
        config.availability_gateway_endpoint = v;
    }
    if let Ok(v) = std::env::var("COMMITTEE_POLLING_INTERVAL") {
        if let Ok(parsed) = v.parse() {
            config.polling_interval = parsed;
        }
    }
    if let Ok(v) = std::env::var("COMMITTEE_PRIVATE_KEY_PATH") {
        config.private_key_path = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("COMMITTEE_LOG_LEVEL") {
        config.log_level = v;
    }
    if let Ok(v) = std::env::var("RUST_LOG") {
        config.log_level = v;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::CommitteeConfig;

    #[test]
    fn cli_overrides_only_touch_set_fields() {
        let mut config = CommitteeConfig { n_workers: 4, ..Default::default() };
        let overrides = ConfigOverrides { polling_interval: Some(2.5), ..Default::default() };
        overrides.apply(&mut config);
        assert_eq!(config.polling_interval, 2.5);
        assert_eq!(config.n_workers, 4);
    }
}
