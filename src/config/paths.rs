use std::{
    env,
    io::{Error, ErrorKind},
    path::PathBuf,
};

const APP_DIR_NAME: &str = "dashboard-player";

/// Utility struct for locating configuration, state, log and cache paths
///
/// Configuration follows the XDG Base Directory specification; runtime data
/// (logs, snapshots, the default media cache) lives under `$HOME/.dashboard-player`.
pub struct ConfigPaths;

impl ConfigPaths {
    /// Returns the configuration directory path for the application
    ///
    /// - First checks `XDG_CONFIG_HOME`
    /// - Falls back to `$HOME/.config`
    /// - Appends "dashboard-player" to the base config directory
    ///
    /// # Errors
    /// Returns an error if neither `XDG_CONFIG_HOME` nor `HOME` environment variables are set
    pub fn config_dir() -> Result<PathBuf, Error> {
        let config_home = env::var("XDG_CONFIG_HOME")
            .or_else(|_| env::var("HOME").map(|home| format!("{home}/.config")))
            .map_err(|_| {
                Error::new(
                    ErrorKind::NotFound,
                    "Neither XDG_CONFIG_HOME nor HOME environment variable found",
                )
            })?;

        Ok(PathBuf::from(config_home).join(APP_DIR_NAME))
    }

    /// Returns the application data directory path
    ///
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if HOME environment variable is not set or directory cannot be created
    pub fn app_data_dir() -> Result<PathBuf, Error> {
        let home = env::var("HOME")
            .map_err(|_| Error::new(ErrorKind::NotFound, "HOME environment variable not found"))?;

        let app_dir = PathBuf::from(home).join(format!(".{APP_DIR_NAME}"));

        if !app_dir.exists() {
            std::fs::create_dir_all(&app_dir)?;
        }

        Ok(app_dir)
    }

    /// Get the application log directory
    ///
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    /// Returns error if directory cannot be created
    pub fn log_dir() -> Result<PathBuf, Error> {
        let log_dir = Self::app_data_dir()?.join("logs");

        if !log_dir.exists() {
            std::fs::create_dir_all(&log_dir)?;
        }

        Ok(log_dir)
    }

    /// Directory holding persisted player snapshots
    ///
    /// # Errors
    /// Returns error if the app data directory is unavailable
    pub fn state_dir() -> Result<PathBuf, Error> {
        Ok(Self::app_data_dir()?.join("state"))
    }

    /// Default directory for mirrored media. Not created here; the cache
    /// store creates it on its first write.
    ///
    /// # Errors
    /// Returns error if the app data directory is unavailable
    pub fn default_cache_dir() -> Result<PathBuf, Error> {
        Ok(Self::app_data_dir()?
            .join("www")
            .join("ha-dashboard-player")
            .join("cache"))
    }

    /// Returns the path to the main configuration file
    ///
    /// # Errors
    /// Returns error if the configuration directory cannot be determined
    pub fn main_config() -> Result<PathBuf, Error> {
        Ok(Self::config_dir()?.join("config.toml"))
    }
}
