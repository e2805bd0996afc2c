//! Configuration schema definitions and validation.
//!
//! Defines the configuration structure for the dashboard player: general
//! settings (logging) and the player section (caching, restore, feedback
//! timeout). All configurations are serializable to/from TOML format.

mod general;
mod loading;
mod paths;
mod player;


pub use general::{GeneralConfig, LogLevel};
pub use paths::ConfigPaths;
pub use player::{DEFAULT_CACHE_URL_PREFIX, DEFAULT_FEEDBACK_TIMEOUT_SECS, PlayerConfig};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Main configuration structure for the dashboard player.
///
/// Represents the complete configuration schema that can be loaded
/// from TOML files. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct Config {
    /// General application settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Virtual media player settings.
    #[serde(default)]
    pub player: PlayerConfig,
}
