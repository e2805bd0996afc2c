use std::path::PathBuf;

/// A media identifier that could not be turned into a playable URL.
///
/// The display text is what the player stores in `last_error`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unable to resolve media: {media_id}")]
pub struct ResolutionError {
    /// The identifier exactly as it was passed to `play_media`
    pub media_id: String,
}

/// Failure to mirror a remote URL into the local cache.
///
/// Cloneable because one download result is handed to every caller that
/// waited on the same URL.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The request could not be sent or the body could not be read
    #[error("request to {url} failed: {details}")]
    Request {
        /// Remote URL
        url: String,
        /// Transport error text
        details: String,
    },

    /// The server answered with a non-2xx status
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Remote URL
        url: String,
        /// Response status code
        status: u16,
    },

    /// The cache directory or file could not be written
    #[error("failed to write {path}: {details}")]
    Write {
        /// Target file or directory
        path: PathBuf,
        /// I/O error text
        details: String,
    },
}

/// Errors a host media-source resolver reports back to the player.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaSourceError {
    /// The identifier does not name anything the host knows about
    #[error("unknown media source item: {0}")]
    Unresolvable(String),

    /// The host knows the item but cannot produce a URL right now
    #[error("media source unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the player service handle.
#[derive(thiserror::Error, Debug)]
pub enum PlayerError {
    /// Command arguments rejected before reaching the player
    #[error("invalid arguments for {command}: {reason}")]
    Validation {
        /// Command name as used on the wire
        command: &'static str,
        /// What was wrong with the arguments
        reason: String,
    },

    /// The player task is no longer running
    #[error("player service is not running")]
    ServiceUnavailable,

    /// Persisted snapshot could not be read or written
    #[error("snapshot store error: {0}")]
    Snapshot(String),

    /// Player configuration could not be applied
    #[error(transparent)]
    Config(#[from] crate::DashboardError),
}
