use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::error::{MediaSourceError, ResolutionError};

const MEDIA_SOURCE_SCHEME: &str = "media-source://";
const LOCAL_MEDIA_PREFIX: &str = "media-source://media_source/local/";
const LOCAL_MEDIA_PATH: &str = "/media/local/";

/// Who is asking the host to resolve a media identifier.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolveContext {
    /// Entity id of the requesting player, e.g. `media_player.kitchen`
    pub entity_id: Option<String>,
}

/// Media-source lookups provided by the host platform.
///
/// Bundles the recognizer, the resolver and the URL finalizer so a host wires
/// one object into the player.
#[async_trait]
pub trait MediaSourceHost: Send + Sync {
    /// Whether `media_id` is an abstract reference the host must resolve.
    fn is_media_source_id(&self, media_id: &str) -> bool {
        media_id.starts_with(MEDIA_SOURCE_SCHEME)
    }

    /// Resolve a reference to a concrete URL.
    ///
    /// `Ok(None)` means the host knows no URL for it.
    ///
    /// # Errors
    /// Returns error if the host cannot resolve the reference
    async fn resolve(
        &self,
        media_id: &str,
        context: &ResolveContext,
    ) -> Result<Option<String>, MediaSourceError>;

    /// Final rewrite applied to a resolved URL (signing, host substitution).
    fn process_play_media_url(&self, url: &str) -> String {
        url.to_string()
    }
}

/// Host without a media-source backend.
///
/// Recognises `media-source://` references but resolves none of them; only
/// the local-library shortcut and plain URLs are playable.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughHost;

#[async_trait]
impl MediaSourceHost for PassthroughHost {
    async fn resolve(
        &self,
        media_id: &str,
        _context: &ResolveContext,
    ) -> Result<Option<String>, MediaSourceError> {
        Err(MediaSourceError::Unresolvable(media_id.to_string()))
    }
}

/// Turns media identifiers into URLs the renderer can load.
#[derive(Clone)]
pub struct MediaResolver {
    host: Arc<dyn MediaSourceHost>,
    context: ResolveContext,
}

impl std::fmt::Debug for MediaResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaResolver")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl MediaResolver {
    /// Resolver backed by `host`, identifying itself with `context`.
    pub fn new(host: Arc<dyn MediaSourceHost>, context: ResolveContext) -> Self {
        Self { host, context }
    }

    /// Resolve `media_id` to a playable URL.
    ///
    /// Local-library references map straight to `/media/local/<path>`,
    /// other media-source references go through the host, and anything else
    /// is assumed to be a URL already.
    ///
    /// # Errors
    /// Returns error if the host fails or has no URL for a media-source reference
    #[instrument(skip(self))]
    pub async fn resolve(&self, media_id: &str) -> Result<String, ResolutionError> {
        if let Some(path) = media_id.strip_prefix(LOCAL_MEDIA_PREFIX) {
            debug!("Local media shortcut");
            return Ok(format!("{LOCAL_MEDIA_PATH}{path}"));
        }

        if !self.host.is_media_source_id(media_id) {
            return Ok(media_id.to_string());
        }

        let unresolved = || ResolutionError {
            media_id: media_id.to_string(),
        };

        match self.host.resolve(media_id, &self.context).await {
            Ok(Some(url)) => Ok(self.host.process_play_media_url(&url)),
            Ok(None) => {
                warn!("Media source returned no URL");
                Err(unresolved())
            }
            Err(e) => {
                warn!(error = %e, "Media source lookup failed");
                Err(unresolved())
            }
        }
    }
}
