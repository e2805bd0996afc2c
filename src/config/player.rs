use std::{path::PathBuf, time::Duration};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigPaths;
use crate::Result;

/// URL prefix under which cached media files are served to the front-end.
pub const DEFAULT_CACHE_URL_PREFIX: &str = "/local/ha-dashboard-player/cache";

/// Seconds without front-end feedback before progress is considered stale.
pub const DEFAULT_FEEDBACK_TIMEOUT_SECS: f64 = 3.0;

const DEFAULT_NAME: &str = "Dashboard Player";
const FALLBACK_ENTITY_NAME: &str = "dashboard_player";

/// Virtual media player configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PlayerConfig {
    /// Display name of the player.
    pub name: String,

    /// Mirror remote http(s) media into the local cache before playing it.
    pub enable_cache: bool,

    /// Seed the player from the last persisted snapshot at startup.
    pub restore_last_media: bool,

    /// Directory cached files are written to. Defaults to
    /// `<app data dir>/www/ha-dashboard-player/cache`.
    pub cache_dir: Option<PathBuf>,

    /// URL prefix the cache directory is served under.
    pub cache_url_prefix: String,

    /// Seconds without feedback before the watchdog clears progress.
    pub feedback_timeout_secs: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            enable_cache: false,
            restore_last_media: true,
            cache_dir: None,
            cache_url_prefix: DEFAULT_CACHE_URL_PREFIX.to_string(),
            feedback_timeout_secs: DEFAULT_FEEDBACK_TIMEOUT_SECS,
        }
    }
}

impl PlayerConfig {
    /// Identifier-safe form of [`name`](Self::name).
    ///
    /// Lowercases the trimmed name, turns every run of characters outside
    /// `[a-z0-9_]` into a single `_`, collapses repeated underscores and strips
    /// them from both ends. An empty result becomes `dashboard_player`.
    pub fn entity_name(&self) -> String {
        sanitize_name(&self.name)
    }

    /// Watchdog delay as a [`Duration`].
    ///
    /// Non-finite or non-positive values fall back to the default delay;
    /// [`Config::validate`](super::Config::validate) rejects them at load time.
    pub fn feedback_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.feedback_timeout_secs)
            .ok()
            .filter(|delay| !delay.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_FEEDBACK_TIMEOUT_SECS))
    }

    /// Cache directory, falling back to the default under the app data dir.
    ///
    /// # Errors
    /// Returns error if no cache directory is configured and the app data
    /// directory cannot be determined
    pub fn resolved_cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(ConfigPaths::default_cache_dir()?),
        }
    }
}

fn sanitize_name(raw_name: &str) -> String {
    let mut name = String::with_capacity(raw_name.len());

    for c in raw_name.trim().to_lowercase().chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '_'
        };
        if c == '_' && name.ends_with('_') {
            continue;
        }
        name.push(c);
    }

    let name = name.trim_matches('_');
    if name.is_empty() {
        FALLBACK_ENTITY_NAME.to_string()
    } else {
        name.to_string()
    }
}
