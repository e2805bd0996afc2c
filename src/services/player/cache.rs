use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::error::CacheError;

type PendingDownload = Shared<BoxFuture<'static, Result<String, CacheError>>>;

/// Content-addressed local mirror of remote media.
///
/// Maps a remote URL to the URL under which the host serves the downloaded
/// copy. Each URL is fetched at most once per process; concurrent requests
/// for the same URL wait on the same download.
#[derive(Clone)]
pub struct CacheStore {
    enabled: bool,
    dir: PathBuf,
    url_prefix: String,
    client: reqwest::Client,
    entries: Arc<RwLock<HashMap<String, String>>>,
    in_flight: Arc<RwLock<HashMap<String, PendingDownload>>>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("enabled", &self.enabled)
            .field("dir", &self.dir)
            .field("url_prefix", &self.url_prefix)
            .finish_non_exhaustive()
    }
}

impl CacheStore {
    /// Create a store writing into `dir` and serving under `url_prefix`.
    ///
    /// The directory is created before the first download, not here.
    pub fn new(
        enabled: bool,
        dir: impl Into<PathBuf>,
        url_prefix: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        let url_prefix = url_prefix.into().trim_end_matches('/').to_string();
        Self {
            enabled,
            dir: dir.into(),
            url_prefix,
            client,
            entries: Arc::new(RwLock::new(HashMap::new())),
            in_flight: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store that never caches anything.
    pub fn disabled() -> Self {
        Self::new(false, PathBuf::new(), "", reqwest::Client::new())
    }

    /// Whether caching is turned on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Local URL for `remote_url` if it has already been cached.
    pub async fn lookup(&self, remote_url: &str) -> Option<String> {
        self.entries.read().await.get(remote_url).cloned()
    }

    /// Mirror `remote_url` locally and return the local URL.
    ///
    /// Returns `Ok(None)` when caching is off or the URL is not plain
    /// `http://`/`https://`. Failures are not remembered, so a later call
    /// tries again.
    ///
    /// # Errors
    /// Returns error if the download fails, the server answers non-2xx, or the
    /// file cannot be written
    #[instrument(skip(self))]
    pub async fn maybe_cache(&self, remote_url: &str) -> Result<Option<String>, CacheError> {
        if !self.enabled || !is_cacheable(remote_url) {
            return Ok(None);
        }

        if let Some(local) = self.lookup(remote_url).await {
            debug!(%local, "Cache hit");
            return Ok(Some(local));
        }

        let pending = {
            let mut in_flight = self.in_flight.write().await;
            match in_flight.get(remote_url) {
                Some(pending) => {
                    debug!("Joining in-flight download");
                    pending.clone()
                }
                None => {
                    let pending = self.clone().fetch(remote_url.to_string()).boxed().shared();
                    in_flight.insert(remote_url.to_string(), pending.clone());
                    pending
                }
            }
        };

        pending.await.map(Some)
    }

    async fn fetch(self, remote_url: String) -> Result<String, CacheError> {
        let result = self.download_to_disk(&remote_url).await;

        if let Ok(local) = &result {
            self.entries
                .write()
                .await
                .insert(remote_url.clone(), local.clone());
        }
        self.in_flight.write().await.remove(&remote_url);

        result
    }

    async fn download_to_disk(&self, remote_url: &str) -> Result<String, CacheError> {
        let filename = cache_filename(remote_url);
        let target = self.dir.join(&filename);
        let local = format!("{}/{filename}", self.url_prefix);

        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            debug!(path = %target.display(), "Reusing file already on disk");
            return Ok(local);
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CacheError::Write {
                path: self.dir.clone(),
                details: e.to_string(),
            })?;

        let response = self
            .client
            .get(remote_url)
            .send()
            .await
            .map_err(|e| request_error(remote_url, &e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Download rejected");
            return Err(CacheError::Status {
                url: remote_url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| request_error(remote_url, &e))?;

        let dir = self.dir.clone();
        let size = body.len();
        tokio::task::spawn_blocking(move || write_atomically(&dir, &filename, &body))
            .await
            .map_err(|e| CacheError::Write {
                path: target.clone(),
                details: e.to_string(),
            })??;

        info!(bytes = size, %local, "Cached media");
        Ok(local)
    }
}

fn request_error(url: &str, error: &reqwest::Error) -> CacheError {
    warn!(error = %error, "Download failed");
    CacheError::Request {
        url: url.to_string(),
        details: error.to_string(),
    }
}

fn write_atomically(dir: &Path, filename: &str, body: &[u8]) -> Result<(), CacheError> {
    let write_error = |path: &Path, e: std::io::Error| CacheError::Write {
        path: path.to_path_buf(),
        details: e.to_string(),
    };

    let target = dir.join(filename);
    let partial = dir.join(format!("{filename}.part"));
    fs::write(&partial, body).map_err(|e| write_error(&partial, e))?;
    fs::rename(&partial, &target).map_err(|e| write_error(&target, e))?;

    Ok(())
}

/// Only absolute `http://` and `https://` URLs are mirrored.
pub fn is_cacheable(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Deterministic cache file name: hex SHA-256 of the whole URL followed by the
/// extension of its last path segment.
pub fn cache_filename(remote_url: &str) -> String {
    let digest = hex::encode(Sha256::digest(remote_url.as_bytes()));
    format!("{digest}{}", path_extension(remote_url))
}

/// Extension (with the dot) of the URL path's last segment, or empty.
///
/// Trailing slashes are ignored. Dot-files and names ending in a dot have no
/// extension.
fn path_extension(remote_url: &str) -> String {
    let Ok(parsed) = Url::parse(remote_url) else {
        return String::new();
    };

    let name = parsed
        .path()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    match name.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < name.len() => name[dot..].to_string(),
        _ => String::new(),
    }
}
