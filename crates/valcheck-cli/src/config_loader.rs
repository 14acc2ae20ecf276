//! Configuration loading utilities for CLI commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use valcheck_core::config::{CliConfigOverrides, LayeredConfig};
use valcheck_core::{DatasetMatrix, RuleTables};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "valcheck.toml";

fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            local.is_file().then_some(local)
        }
    }
}

/// Load layered configuration: defaults, config file, environment
pub fn load_config(explicit: Option<&Path>) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::with_defaults();
    if let Some(path) = config_path(explicit) {
        tracing::debug!("Loading configuration from {}", path.display());
        config = config
            .load_from_file(&path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?;
    }
    Ok(config.load_from_env())
}

/// Load layered configuration with CLI overrides
pub fn load_config_with_overrides(
    explicit: Option<&Path>,
    overrides: CliConfigOverrides,
) -> Result<LayeredConfig> {
    let mut config = load_config(explicit)?;
    config.update_from_cli(overrides);
    Ok(config)
}

/// The configured dataset matrix, or the built-in one
pub fn load_matrix(config: &LayeredConfig) -> Result<DatasetMatrix> {
    match &config.matrix.value {
        Some(path) => DatasetMatrix::load(path)
            .with_context(|| format!("Failed to load dataset matrix {}", path.display())),
        None => DatasetMatrix::builtin().context("Built-in dataset matrix is invalid"),
    }
}

/// The configured rule tables, or the built-in ones
pub fn load_rules(config: &LayeredConfig) -> Result<RuleTables> {
    match &config.rules.value {
        Some(path) => RuleTables::load(path)
            .with_context(|| format!("Failed to load rule tables {}", path.display())),
        None => RuleTables::builtin().context("Built-in rule tables are invalid"),
    }
}
