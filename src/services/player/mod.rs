//! Virtual dashboard media player.
//!
//! A single task owns the [`PlaybackState`]; hosts talk to it through the
//! cloneable [`PlayerService`] handle and watch the published
//! [`PlayerSnapshot`]. Media identifiers are resolved by [`MediaResolver`],
//! remote media is mirrored by [`CacheStore`], and [`FeedbackWatchdog`] drops
//! stale progress when the front-end stops reporting.

/// Local mirror of remote media
pub mod cache;
/// Wire commands and argument validation
pub mod command;
/// Player error types
pub mod error;
/// Media identifier resolution
pub mod resolver;
/// Actor task and service handle
pub mod service;
/// Published player attributes
pub mod snapshot;
/// Playback state and transition rules
pub mod state;
/// Status, repeat and capability types
pub mod types;
/// Feedback timeout timer
pub mod watchdog;

#[cfg(test)]
mod tests;

pub use cache::CacheStore;
pub use command::PlayerCommand;
pub use error::{CacheError, MediaSourceError, PlayerError, ResolutionError};
pub use resolver::{MediaResolver, MediaSourceHost, PassthroughHost, ResolveContext};
pub use service::{PlayerOptions, PlayerService};
pub use snapshot::PlayerSnapshot;
pub use state::{LoadedMedia, PlaybackState, ReportOutcome, StateReport};
pub use types::{PlayerStatus, RepeatMode, SupportedFeatures, is_playlist, is_still_image};
pub use watchdog::FeedbackWatchdog;
