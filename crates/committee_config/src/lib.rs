//! Layered committee configuration: a TOML file overlaid by `COMMITTEE_*`/`RUST_LOG` environment
//! variables, overlaid by explicit CLI flags, in that precedence order — matching the teacher's
//! own `apollo_config` file → env → CLI convention without depending on that internal crate.

pub mod cli;
pub mod config;
pub mod errors;

pub use cli::ConfigOverrides;
pub use config::CommitteeConfig;
pub use errors::{ConfigError, ConfigResult};

use std::path::Path;

/// Loads a config file (if given), applies environment overrides, then CLI overrides, then
/// validates the final result once.
pub fn load(file_path: Option<&Path>, overrides: &ConfigOverrides) -> ConfigResult<CommitteeConfig> {
    let mut config = match file_path {
        Some(path) => CommitteeConfig::from_toml_file(path)?,
        None => CommitteeConfig::default(),
    };
    cli::apply_env_overrides(&mut config);
    overrides.apply(&mut config);
    config.validate_all()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn load_with_no_file_uses_defaults_plus_overrides() {
        let overrides =
            ConfigOverrides { availability_gateway_endpoint: Some("https://gateway.example.com".to_string()), ..Default::default() };
        let config = load(None, &overrides).unwrap();
        assert_eq!(config.availability_gateway_endpoint, "https://gateway.example.com");
        assert_eq!(config.polling_interval, 1.0);
    }

    /// The file alone is invalid (no `availability_gateway_endpoint`, which has no valid default);
    /// only the CLI overlay supplies it. `load` must validate once, after the overlay runs, not
    /// while `from_toml_file` is still parsing the file in isolation.
    #[test]
    fn load_validates_after_the_overlay_not_the_bare_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("committee.toml");
        std::fs::write(&path, "polling_interval = 2.0\n").unwrap();

        let overrides =
            ConfigOverrides { availability_gateway_endpoint: Some("https://gateway.example.com".to_string()), ..Default::default() };
        let config = load(Some(&path), &overrides).unwrap();
        assert_eq!(config.availability_gateway_endpoint, "https://gateway.example.com");
        assert_eq!(config.polling_interval, 2.0);
    }

    #[test]
    fn load_surfaces_validation_errors_once_the_overlay_still_leaves_the_config_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("committee.toml");
        std::fs::write(&path, "polling_interval = 2.0\n").unwrap();

        let result = load(Some(&path), &ConfigOverrides::default());
        assert!(result.is_err());
    }
}
