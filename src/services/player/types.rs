use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Current status of the virtual player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlayerStatus {
    /// Explicitly turned off; otherwise behaves like `Idle`
    Off,

    /// Nothing loaded
    #[default]
    Idle,

    /// Media loaded and playing
    Playing,

    /// Media loaded and paused
    Paused,
}

impl PlayerStatus {
    /// Whether the player currently has a timeline worth tracking.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

impl From<&str> for PlayerStatus {
    fn from(status: &str) -> Self {
        match status {
            "off" => Self::Off,
            "playing" => Self::Playing,
            "paused" => Self::Paused,
            _ => Self::Idle,
        }
    }
}

impl From<String> for PlayerStatus {
    fn from(status: String) -> Self {
        Self::from(status.as_str())
    }
}

impl From<PlayerStatus> for &'static str {
    fn from(status: PlayerStatus) -> Self {
        match status {
            PlayerStatus::Off => "off",
            PlayerStatus::Idle => "idle",
            PlayerStatus::Playing => "playing",
            PlayerStatus::Paused => "paused",
        }
    }
}

impl From<PlayerStatus> for String {
    fn from(status: PlayerStatus) -> Self {
        <&'static str>::from(status).to_string()
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str((*self).into())
    }
}

/// Repeat mode for the loaded media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Play once
    Off,

    /// Loop the current item
    One,

    /// Loop the whole playlist
    All,
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Off => "off",
            Self::One => "one",
            Self::All => "all",
        };
        f.write_str(label)
    }
}

bitflags! {
    /// Controls the front-end may offer for the current media.
    ///
    /// Bit values match the Home Assistant media player feature flags so the
    /// mask can be published as-is.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SupportedFeatures: u32 {
        /// Pause playback.
        const PAUSE = 1;
        /// Seek within the media.
        const SEEK = 1 << 1;
        /// Set the volume level.
        const VOLUME_SET = 1 << 2;
        /// Mute and unmute.
        const VOLUME_MUTE = 1 << 3;
        /// Turn the player on.
        const TURN_ON = 1 << 7;
        /// Turn the player off.
        const TURN_OFF = 1 << 8;
        /// Load new media.
        const PLAY_MEDIA = 1 << 9;
        /// Stop and clear the current media.
        const STOP = 1 << 12;
        /// Resume playback.
        const PLAY = 1 << 14;
        /// Toggle shuffle.
        const SHUFFLE_SET = 1 << 15;
        /// Change the repeat mode.
        const REPEAT_SET = 1 << 18;
    }
}

impl SupportedFeatures {
    /// Features offered regardless of what is loaded.
    pub const ALWAYS: Self = Self::PLAY
        .union(Self::PAUSE)
        .union(Self::SEEK)
        .union(Self::VOLUME_SET)
        .union(Self::VOLUME_MUTE)
        .union(Self::PLAY_MEDIA)
        .union(Self::TURN_ON)
        .union(Self::TURN_OFF);
}

const PLAYLIST_EXTENSIONS: [&str; 3] = [".m3u", ".m3u8", ".pls"];

/// Whether the content type names a still image (`image/*`).
pub fn is_still_image(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|kind| kind.to_ascii_lowercase().starts_with("image"))
}

/// Whether the media is a playlist.
///
/// True when the content type mentions "playlist" or the content id ends in a
/// playlist file extension, both compared case-insensitively.
pub fn is_playlist(content_type: Option<&str>, content_id: Option<&str>) -> bool {
    let by_type =
        content_type.is_some_and(|kind| kind.to_ascii_lowercase().contains("playlist"));
    let by_id = content_id.is_some_and(|id| {
        let id = id.to_ascii_lowercase();
        PLAYLIST_EXTENSIONS.iter().any(|ext| id.ends_with(ext))
    });

    by_type || by_id
}
