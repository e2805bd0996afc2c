use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::{
    snapshot::PlayerSnapshot,
    types::{PlayerStatus, RepeatMode, SupportedFeatures, is_playlist, is_still_image},
};

/// Media that finished resolving (and possibly caching) and is ready to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedMedia {
    /// Content type as requested
    pub content_type: String,
    /// Identifier as requested
    pub content_id: String,
    /// URL for the renderer, the cached mirror when there is one
    pub media_url: String,
    /// Cached mirror, set only when caching succeeded for this load
    pub cached_url: Option<String>,
}

/// Playback feedback pushed by the rendering front-end.
///
/// Every field is optional; absent fields leave the player untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateReport {
    /// Renderer's own status label, informational only
    pub state: Option<String>,
    /// Current position in seconds
    pub media_position: Option<f64>,
    /// Media duration in seconds
    pub media_duration: Option<f64>,
    /// Volume in `[0, 1]`
    pub volume_level: Option<f64>,
    /// Mute flag
    pub is_volume_muted: Option<bool>,
    /// Repeat mode
    pub repeat: Option<RepeatMode>,
    /// Shuffle flag
    pub shuffle: Option<bool>,
}

/// What a feedback report did to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Player is idle or off; progress was cleared and the report discarded
    Discarded,
    /// Report applied; the watchdog should be re-armed
    Applied,
}

/// The single source of truth for one player.
///
/// Only the player task mutates it; every method is synchronous.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackState {
    pub(crate) status: PlayerStatus,
    pub(crate) media_url: Option<String>,
    pub(crate) cached_url: Option<String>,
    pub(crate) content_type: Option<String>,
    pub(crate) content_id: Option<String>,
    pub(crate) position: Option<f64>,
    pub(crate) duration: Option<f64>,
    pub(crate) position_updated_at: Option<DateTime<Utc>>,
    pub(crate) volume: Option<f64>,
    pub(crate) muted: Option<bool>,
    pub(crate) repeat: Option<RepeatMode>,
    pub(crate) shuffle: Option<bool>,
    pub(crate) last_error: Option<String>,
    pub(crate) cache_enabled: bool,
    pub(crate) last_feedback: Option<Instant>,
}

impl PlaybackState {
    /// Fresh idle state.
    pub fn new(cache_enabled: bool) -> Self {
        Self {
            cache_enabled,
            ..Self::default()
        }
    }

    /// Current status.
    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    /// Whether the loaded media is a playlist.
    pub fn is_playlist(&self) -> bool {
        is_playlist(self.content_type.as_deref(), self.content_id.as_deref())
    }

    /// Whether the loaded media is a still image.
    pub fn is_still_image(&self) -> bool {
        is_still_image(self.content_type.as_deref())
    }

    /// Repeat makes sense only for known, non-image media.
    pub fn is_repeat_capable(&self) -> bool {
        self.content_type.is_some() && !self.is_still_image()
    }

    /// Controls currently on offer, derived from what is loaded.
    pub fn capabilities(&self) -> SupportedFeatures {
        let mut features = SupportedFeatures::ALWAYS;
        features.set(SupportedFeatures::STOP, self.media_url.is_some());
        features.set(SupportedFeatures::REPEAT_SET, self.is_repeat_capable());
        features.set(SupportedFeatures::SHUFFLE_SET, self.is_playlist());
        features
    }

    pub(crate) fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub(crate) fn set_error(&mut self, error: impl ToString) {
        self.last_error = Some(error.to_string());
    }

    fn clear_progress(&mut self) {
        self.position = None;
        self.duration = None;
        self.position_updated_at = None;
    }

    /// Load resolved media and start playing it.
    pub fn load_media(&mut self, media: LoadedMedia) {
        self.media_url = Some(media.media_url);
        self.cached_url = media.cached_url;
        self.content_type = Some(media.content_type);
        self.content_id = Some(media.content_id);
        self.last_feedback = None;

        if self.is_still_image() {
            self.position = Some(0.0);
            self.duration = Some(0.0);
            self.position_updated_at = None;
            self.repeat = None;
            self.shuffle = Some(false);
        } else {
            self.position = Some(0.0);
            self.duration = None;
            self.position_updated_at = Some(Utc::now());
            if !self.is_playlist() {
                self.shuffle = Some(false);
                if self.repeat == Some(RepeatMode::All) {
                    self.repeat = Some(RepeatMode::One);
                }
            }
        }

        self.status = PlayerStatus::Playing;
    }

    /// Remember a preloaded mirror without touching playback.
    pub fn store_preloaded(&mut self, cached_url: String) {
        self.cached_url = Some(cached_url);
    }

    /// Resume; ignored when nothing is loaded.
    pub fn play(&mut self) {
        if self.media_url.is_some() {
            self.status = PlayerStatus::Playing;
        }
    }

    /// Pause; ignored when nothing is loaded.
    pub fn pause(&mut self) {
        if self.media_url.is_some() {
            self.status = PlayerStatus::Paused;
        }
    }

    /// Drop the loaded media and go idle. Shared by stop and clear.
    pub fn clear_media(&mut self) {
        self.media_url = None;
        self.cached_url = None;
        self.content_type = None;
        self.content_id = None;
        self.clear_progress();
        self.last_feedback = None;
        self.status = PlayerStatus::Idle;
    }

    /// Leave the off state.
    pub fn turn_on(&mut self) {
        self.status = if self.media_url.is_some() {
            PlayerStatus::Playing
        } else {
            PlayerStatus::Idle
        };
    }

    /// Clear everything and report off.
    pub fn turn_off(&mut self) {
        self.clear_media();
        self.status = PlayerStatus::Off;
    }

    /// Move the position, loaded media or not.
    pub fn seek(&mut self, position: f64) {
        self.position = Some(position);
        self.position_updated_at = Some(Utc::now());
    }

    /// Set the volume level.
    pub fn set_volume(&mut self, level: f64) {
        self.volume = Some(level);
    }

    /// Set the mute flag.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = Some(muted);
    }

    /// Change repeat within what the loaded media allows.
    pub fn set_repeat(&mut self, repeat: RepeatMode) {
        if !self.is_repeat_capable() {
            return;
        }
        self.repeat = Some(self.allowed_repeat(repeat));
    }

    /// Change shuffle; always off for anything but playlists.
    pub fn set_shuffle(&mut self, shuffle: bool) {
        self.shuffle = Some(shuffle && self.is_playlist());
    }

    fn allowed_repeat(&self, repeat: RepeatMode) -> RepeatMode {
        if repeat == RepeatMode::All && !self.is_playlist() {
            RepeatMode::One
        } else {
            repeat
        }
    }

    /// Fold a feedback report into the state.
    ///
    /// `now` becomes the last feedback instant when the report is applied.
    pub fn apply_report(&mut self, report: &StateReport, now: Instant) -> ReportOutcome {
        if !self.status.is_active() {
            self.clear_progress();
            return ReportOutcome::Discarded;
        }

        self.last_feedback = Some(now);

        if let Some(position) = report.media_position.filter(|p| p.is_finite() && *p >= 0.0) {
            self.position = Some(position);
            self.position_updated_at = Some(Utc::now());
        }

        if let Some(duration) = report.media_duration.filter(|d| d.is_finite()) {
            if duration <= 0.0 {
                self.duration = Some(0.0);
                self.position = Some(0.0);
                self.position_updated_at = None;
            } else {
                self.duration = Some(duration);
            }
        }

        if let Some(volume) = report.volume_level.filter(|v| v.is_finite()) {
            self.volume = Some(volume);
        }
        if let Some(muted) = report.is_volume_muted {
            self.muted = Some(muted);
        }
        if let Some(repeat) = report.repeat {
            self.repeat = Some(self.allowed_repeat(repeat));
        }
        if let Some(shuffle) = report.shuffle {
            self.shuffle = Some(shuffle && self.is_playlist());
        }

        ReportOutcome::Applied
    }

    /// Whether at least `delay` has passed since the last applied report.
    pub fn feedback_elapsed(&self, delay: Duration, now: Instant) -> bool {
        self.last_feedback
            .is_none_or(|last| now.saturating_duration_since(last) >= delay)
    }

    /// Forget progress after the front-end went quiet.
    ///
    /// Returns whether anything changed. Images keep their zeroed timeline and
    /// idle or off players have nothing to forget.
    pub fn expire_progress(&mut self, delay: Duration, now: Instant) -> bool {
        if !self.feedback_elapsed(delay, now) || self.is_still_image() {
            return false;
        }
        if !self.status.is_active() {
            return false;
        }

        let before = (self.position, self.duration, self.position_updated_at);
        self.clear_progress();
        before != (None, None, None)
    }

    /// Published view of the state.
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            state: self.status,
            media_content_type: self.content_type.clone(),
            media_content_id: self.content_id.clone(),
            media_position: self.position,
            media_duration: self.duration,
            media_position_updated_at: self.position_updated_at,
            volume_level: self.volume,
            is_volume_muted: self.muted,
            repeat: self.repeat,
            shuffle: self.shuffle,
            media_url: self.media_url.clone(),
            cached_media_url: self.cached_url.clone(),
            cache_enabled: self.cache_enabled,
            last_error: self.last_error.clone(),
            supported_features: self.capabilities().bits(),
        }
    }

    /// Seed the state from a persisted snapshot.
    ///
    /// `cache_enabled` stays as configured and `last_error` is not carried
    /// over. Returns whether the restored player is mid-playback, in which
    /// case the caller arms the watchdog.
    pub fn restore(&mut self, snapshot: PlayerSnapshot) -> bool {
        self.status = snapshot.state;
        self.content_type = snapshot.media_content_type;
        self.content_id = snapshot.media_content_id;
        self.position = snapshot.media_position;
        self.duration = snapshot.media_duration;
        self.position_updated_at = snapshot.media_position_updated_at;
        self.volume = snapshot.volume_level;
        self.muted = snapshot.is_volume_muted;
        self.repeat = snapshot.repeat;
        self.shuffle = snapshot.shuffle;
        self.media_url = snapshot.media_url;
        self.cached_url = snapshot.cached_media_url;
        self.last_error = None;
        self.last_feedback = None;

        if !self.status.is_active() {
            self.clear_progress();
        }

        self.status.is_active()
    }
}
