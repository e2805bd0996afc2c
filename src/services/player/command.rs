use serde::{Deserialize, Serialize};

use super::{error::PlayerError, state::StateReport, types::RepeatMode};

/// Everything a host can ask the player to do.
///
/// Serialised as an object tagged by `command`, for example
/// `{"command": "seek", "position": 12.5}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PlayerCommand {
    /// Leave the off state
    TurnOn,
    /// Clear media and switch off
    TurnOff,
    /// Resume loaded media
    Play,
    /// Pause loaded media
    Pause,
    /// Stop and unload media
    Stop,
    /// Move to a position in seconds
    Seek {
        /// Target position in seconds
        position: f64,
    },
    /// Change the volume
    SetVolume {
        /// Level in `[0, 1]`
        level: f64,
    },
    /// Mute or unmute
    Mute {
        /// New mute flag
        muted: bool,
    },
    /// Change repeat mode
    SetRepeat {
        /// Requested mode
        repeat: RepeatMode,
    },
    /// Toggle shuffle
    SetShuffle {
        /// Requested flag
        shuffle: bool,
    },
    /// Resolve, cache and start playing media
    PlayMedia {
        /// Content type, e.g. `video/mp4`
        media_type: String,
        /// URL or media-source reference
        media_id: String,
    },
    /// Warm the cache with a URL without playing it
    PreloadMedia {
        /// Remote URL to mirror
        media_url: String,
    },
    /// Blank the screen; same as stop
    ClearScreen,
    /// Feedback from the rendering front-end
    ReportState(StateReport),
}

impl PlayerCommand {
    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TurnOn => "turn_on",
            Self::TurnOff => "turn_off",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Seek { .. } => "seek",
            Self::SetVolume { .. } => "set_volume",
            Self::Mute { .. } => "mute",
            Self::SetRepeat { .. } => "set_repeat",
            Self::SetShuffle { .. } => "set_shuffle",
            Self::PlayMedia { .. } => "play_media",
            Self::PreloadMedia { .. } => "preload_media",
            Self::ClearScreen => "clear_screen",
            Self::ReportState(_) => "report_state",
        }
    }

    /// Reject malformed arguments before they reach the player.
    ///
    /// # Errors
    /// Returns `PlayerError::Validation` describing the first bad argument
    pub fn validate(&self) -> Result<(), PlayerError> {
        let reject = |reason: &str| -> Result<(), PlayerError> {
            Err(PlayerError::Validation {
                command: self.name(),
                reason: reason.to_string(),
            })
        };

        match self {
            Self::Seek { position } if !position.is_finite() || *position < 0.0 => {
                reject("position must be a finite number of seconds >= 0")
            }
            Self::SetVolume { level } if !level.is_finite() || !(0.0..=1.0).contains(level) => {
                reject("level must be between 0 and 1")
            }
            Self::PlayMedia { media_type, .. } if media_type.trim().is_empty() => {
                reject("media_type must not be empty")
            }
            Self::PlayMedia { media_id, .. } if media_id.trim().is_empty() => {
                reject("media_id must not be empty")
            }
            Self::PreloadMedia { media_url } if media_url.trim().is_empty() => {
                reject("media_url must not be empty")
            }
            _ => Ok(()),
        }
    }
}
