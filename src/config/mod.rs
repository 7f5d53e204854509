// Configuration module for daylog
//
// Provides:
// - YAML configuration file loading
// - Environment variable substitution
// - Configuration validation
// - Default values

pub mod types;
mod loader;

pub use types::*;
pub use loader::ConfigLoader;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<DaylogConfig> {
    ConfigLoader::load(path).context("Failed to load configuration")
}

/// Load configuration with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<DaylogConfig> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Apply `DAYLOG_*` environment overrides and re-validate
pub fn apply_env_overrides(config: &mut DaylogConfig) -> Result<()> {
    if let Ok(base_path) = std::env::var("DAYLOG_BASE_PATH") {
        config.storage.base_path = PathBuf::from(base_path);
    }

    if let Ok(interval) = std::env::var("DAYLOG_FLUSH_INTERVAL_MS") {
        config.flush.interval_ms = interval
            .parse()
            .context("DAYLOG_FLUSH_INTERVAL_MS must be an integer")?;
    }

    if let Ok(level) = std::env::var("DAYLOG_LOG_LEVEL") {
        config.logging.level = level;
    }

    ConfigLoader::validate(config)
}
