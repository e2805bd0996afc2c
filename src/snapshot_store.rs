use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::{
    DashboardError,
    config::ConfigPaths,
    services::player::{PlayerError, PlayerSnapshot},
};

/// Where the host keeps the last published snapshot of a player.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Last saved snapshot, `None` when nothing usable was saved.
    ///
    /// # Errors
    /// Returns error if the backing storage cannot be read
    async fn load(&self) -> Result<Option<PlayerSnapshot>, PlayerError>;

    /// Replace the saved snapshot.
    ///
    /// # Errors
    /// Returns error if the backing storage cannot be written
    async fn save(&self, snapshot: &PlayerSnapshot) -> Result<(), PlayerError>;
}

/// One pretty-printed JSON file per player, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    /// Store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for `entity_name` under the application state directory.
    ///
    /// # Errors
    /// Returns error if the state directory cannot be determined
    pub fn for_player(entity_name: &str) -> Result<Self, DashboardError> {
        let dir = ConfigPaths::state_dir()?;
        Ok(Self::new(dir.join(format!("{entity_name}.json"))))
    }

    /// File this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Option<PlayerSnapshot>, PlayerError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No saved snapshot");
                return Ok(None);
            }
            Err(e) => return Err(PlayerError::Snapshot(e.to_string())),
        };

        match serde_json::from_str(&content) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(error = %e, "Invalid snapshot file, starting fresh");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, snapshot), fields(path = %self.path.display()))]
    async fn save(&self, snapshot: &PlayerSnapshot) -> Result<(), PlayerError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PlayerError::Snapshot(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| PlayerError::Snapshot(e.to_string()))?;

        let mut partial = self.path.clone().into_os_string();
        partial.push(".part");
        tokio::fs::write(&partial, content)
            .await
            .map_err(|e| PlayerError::Snapshot(e.to_string()))?;
        tokio::fs::rename(&partial, &self.path)
            .await
            .map_err(|e| PlayerError::Snapshot(e.to_string()))?;

        Ok(())
    }
}

/// In-process store, for tests and hosts that persist elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    saved: Arc<RwLock<Option<PlayerSnapshot>>>,
}

impl MemorySnapshotStore {
    /// Store pre-seeded with `snapshot`.
    pub fn with_snapshot(snapshot: PlayerSnapshot) -> Self {
        Self {
            saved: Arc::new(RwLock::new(Some(snapshot))),
        }
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Option<PlayerSnapshot>, PlayerError> {
        Ok(self.saved.read().await.clone())
    }

    async fn save(&self, snapshot: &PlayerSnapshot) -> Result<(), PlayerError> {
        *self.saved.write().await = Some(snapshot.clone());
        Ok(())
    }
}
