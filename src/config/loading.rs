use std::{fs, path::Path};

use tracing::{debug, info, instrument};

use super::{Config, ConfigPaths};
use crate::{DashboardError, Result};

impl Config {
    /// Loads and validates the configuration file at `path`.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, is not valid TOML, or fails validation
    #[instrument]
    pub fn load(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| DashboardError::io_at(e, path))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| DashboardError::toml_parse(e, Some(path)))?;
        config.validate()?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    /// Returns error if the string is not valid TOML or fails validation
    pub fn from_toml_str(content: &str) -> Result<Config> {
        let config: Config =
            toml::from_str(content).map_err(|e| DashboardError::toml_parse(e, None))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the main configuration file when it exists, defaults otherwise.
    ///
    /// # Errors
    /// Returns error if the config directory cannot be determined or an
    /// existing file fails to load
    pub fn load_or_default() -> Result<Config> {
        let path = ConfigPaths::main_config()?;

        if path.exists() {
            Self::load(&path)
        } else {
            debug!("No configuration at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    /// Checks values serde cannot constrain on its own.
    ///
    /// # Errors
    /// Returns `InvalidConfigField` for a non-finite or non-positive feedback
    /// timeout, or a cache URL prefix that is not an absolute path or URL
    pub fn validate(&self) -> Result<()> {
        let timeout = self.player.feedback_timeout_secs;
        if !timeout.is_finite() || timeout <= 0.0 {
            return Err(DashboardError::InvalidConfigField {
                field: "feedback_timeout_secs".to_string(),
                component: "player".to_string(),
                reason: format!("must be a positive number of seconds, got {timeout}"),
            });
        }

        let prefix = &self.player.cache_url_prefix;
        if !(prefix.starts_with('/') || prefix.starts_with("http://") || prefix.starts_with("https://"))
        {
            return Err(DashboardError::InvalidConfigField {
                field: "cache_url_prefix".to_string(),
                component: "player".to_string(),
                reason: format!("'{prefix}' is neither an absolute path nor an http(s) URL"),
            });
        }

        Ok(())
    }
}
