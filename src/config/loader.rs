// Configuration loader with environment variable substitution

use super::types::*;
use crate::storage::validate_table_name;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}:]+)(?::-([^}]+))?\}").expect("env var pattern is valid")
});

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["text", "compact"];

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DaylogConfig> {
        let content = std::fs::read_to_string(path.as_ref())
            .context("Failed to read config file")?;

        Self::parse(&content)
    }

    /// Parse YAML text after substituting environment variables
    pub fn parse(content: &str) -> Result<DaylogConfig> {
        let content = Self::substitute_env_vars(content);

        let config: DaylogConfig = serde_yaml::from_str(&content)
            .context("Failed to parse YAML configuration")?;

        Self::validate(&config)?;

        Ok(config)
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${HOME} -> /home/user
    /// - ${LOG_DIR:-/var/log/daylog} -> /var/log/daylog (if LOG_DIR not set)
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_PATTERN.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if let Some(default) = default_value {
                        default.to_string()
                    } else {
                        // Keep original if no default and var not found
                        format!("${{{}}}", var_name)
                    }
                }
            }
        }).to_string()
    }

    /// Validate configuration
    pub fn validate(config: &DaylogConfig) -> Result<()> {
        if config.flush.interval_ms == 0 {
            bail!("flush.interval_ms must be > 0");
        }

        if config.storage.file_name.trim().is_empty() {
            bail!("storage.file_name cannot be empty");
        }

        if config.storage.file_name.contains(['/', '\\']) {
            bail!("storage.file_name must be a bare file name");
        }

        if config.storage.base_path.as_os_str().is_empty() {
            bail!("storage.base_path cannot be empty");
        }

        validate_table_name(&config.storage.table_name)
            .context("storage.table_name must be a plain SQL identifier")?;

        let level = config.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            bail!(
                "Unknown logging.level: '{}'. Supported: {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            );
        }

        if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
            bail!(
                "Unknown logging.format: '{}'. Supported: {}",
                config.logging.format,
                LOG_FORMATS.join(", ")
            );
        }

        Ok(())
    }
}
