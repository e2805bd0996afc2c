use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{PlayerStatus, RepeatMode};

/// Attributes the player publishes after every change.
///
/// This is both what the host renders and what it persists, so every field
/// tolerates being absent when read back from an older file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSnapshot {
    /// Status label (`off`, `idle`, `playing`, `paused`)
    pub state: PlayerStatus,

    /// Content type of the loaded media
    pub media_content_type: Option<String>,

    /// Identifier the media was requested with
    pub media_content_id: Option<String>,

    /// Position in seconds
    pub media_position: Option<f64>,

    /// Duration in seconds
    pub media_duration: Option<f64>,

    /// When `media_position` was last authoritative
    pub media_position_updated_at: Option<DateTime<Utc>>,

    /// Volume in `[0, 1]`
    pub volume_level: Option<f64>,

    /// Mute flag
    pub is_volume_muted: Option<bool>,

    /// Repeat mode
    pub repeat: Option<RepeatMode>,

    /// Shuffle flag
    pub shuffle: Option<bool>,

    /// URL handed to the renderer
    pub media_url: Option<String>,

    /// Local mirror of the media, when caching succeeded
    pub cached_media_url: Option<String>,

    /// Whether this player mirrors remote media
    pub cache_enabled: bool,

    /// Text of the last resolution or cache failure
    pub last_error: Option<String>,

    /// Capability bitmask, see [`SupportedFeatures`](super::SupportedFeatures)
    pub supported_features: u32,
}
