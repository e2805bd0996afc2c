use std::{sync::Arc, time::Duration};

use futures::{Stream, StreamExt};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::Instant,
};
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use super::{
    cache::CacheStore,
    command::PlayerCommand,
    error::{CacheError, PlayerError, ResolutionError},
    resolver::{MediaResolver, MediaSourceHost, ResolveContext},
    snapshot::PlayerSnapshot,
    state::{LoadedMedia, PlaybackState, ReportOutcome, StateReport},
    types::{RepeatMode, SupportedFeatures},
    watchdog::FeedbackWatchdog,
};
use crate::{config::PlayerConfig, services::common::Property, snapshot_store::SnapshotStore};

type Reply = oneshot::Sender<PlayerSnapshot>;

/// Everything needed to start a player.
#[derive(Debug)]
pub struct PlayerOptions {
    /// Sanitised player name, used in logs and as the resolve context
    pub entity_name: String,
    /// Cache store; its enabled flag becomes `cache_enabled`
    pub cache: CacheStore,
    /// Media identifier resolver
    pub resolver: MediaResolver,
    /// Silence after which reported progress is dropped
    pub feedback_timeout: Duration,
    /// Snapshot to seed the state from
    pub restore: Option<PlayerSnapshot>,
}

#[derive(Debug)]
enum PlayerMessage {
    Command {
        command: PlayerCommand,
        respond_to: Reply,
    },
    MediaLoaded {
        load_id: u64,
        outcome: Result<LoadedMedia, ResolutionError>,
        cache_error: Option<CacheError>,
        respond_to: Reply,
    },
    Preloaded {
        outcome: Result<Option<String>, CacheError>,
        respond_to: Reply,
    },
    WatchdogExpired {
        generation: u64,
    },
    Shutdown,
}

/// Handle to a running virtual media player.
///
/// Cloning is cheap; all clones talk to the same player task. The task stops
/// when [`shutdown`](Self::shutdown) is called or every handle is dropped.
pub struct PlayerService {
    command_tx: mpsc::UnboundedSender<PlayerMessage>,
    snapshot: Property<PlayerSnapshot>,
    actor_handle: Option<JoinHandle<()>>,
    persistence: Option<Persistence>,
}

struct Persistence {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Clone for PlayerService {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            snapshot: self.snapshot.clone(),
            actor_handle: None,
            persistence: None,
        }
    }
}

impl std::fmt::Debug for PlayerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerService")
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}

impl PlayerService {
    /// Spawn the player task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(options: PlayerOptions) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let mut state = PlaybackState::new(options.cache.is_enabled());
        let restored_active = options
            .restore
            .map(|snapshot| state.restore(snapshot))
            .unwrap_or(false);

        let snapshot = Property::new(state.snapshot());

        let weak_tx = command_tx.downgrade();
        let mut watchdog = FeedbackWatchdog::new(options.feedback_timeout, move |generation| {
            if let Some(tx) = weak_tx.upgrade() {
                let _ = tx.send(PlayerMessage::WatchdogExpired { generation });
            }
        });
        if restored_active {
            watchdog.arm();
        }

        let actor = PlayerActor {
            state,
            cache: options.cache,
            resolver: options.resolver,
            watchdog,
            snapshot: snapshot.clone(),
            self_tx: command_tx.downgrade(),
            load_id: 0,
        };

        let span = info_span!("player", name = %options.entity_name);
        let actor_handle = tokio::spawn(actor.run(command_rx).instrument(span));

        Self {
            command_tx,
            snapshot,
            actor_handle: Some(actor_handle),
            persistence: None,
        }
    }

    /// Build a player from configuration.
    ///
    /// Loads the last snapshot from `store` when `restore_last_media` is set
    /// and keeps saving every published snapshot into it.
    ///
    /// # Errors
    /// Returns error if the cache directory cannot be determined or the
    /// stored snapshot cannot be read
    #[instrument(skip_all, fields(name = %config.name))]
    pub async fn from_config(
        config: &PlayerConfig,
        host: Arc<dyn MediaSourceHost>,
        client: reqwest::Client,
        store: Arc<dyn SnapshotStore>,
    ) -> Result<Self, PlayerError> {
        let entity_name = config.entity_name();

        let cache = if config.enable_cache {
            CacheStore::new(
                true,
                config.resolved_cache_dir()?,
                config.cache_url_prefix.clone(),
                client,
            )
        } else {
            CacheStore::new(false, "", config.cache_url_prefix.clone(), client)
        };

        let restore = if config.restore_last_media {
            store.load().await?
        } else {
            None
        };
        if restore.is_some() {
            info!("Restoring last media");
        }

        let resolver = MediaResolver::new(
            host,
            ResolveContext {
                entity_id: Some(format!("media_player.{entity_name}")),
            },
        );

        let mut service = Self::start(PlayerOptions {
            entity_name,
            cache,
            resolver,
            feedback_timeout: config.feedback_timeout(),
            restore,
        });
        service.persist_to(store);

        Ok(service)
    }

    /// Save every published snapshot into `store` until the player stops.
    ///
    /// Saving ends when this handle is shut down or dropped; clones do not
    /// carry it. [`shutdown`](Self::shutdown) writes the final snapshot
    /// before it returns. Replaces any store set earlier on this handle.
    pub fn persist_to(&mut self, store: Arc<dyn SnapshotStore>) {
        let changes = self.snapshot.watch();
        let latest = self.snapshot.clone();
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let handle = tokio::spawn(
            async move {
                let mut changes = std::pin::pin!(changes);
                loop {
                    tokio::select! {
                        Some(snapshot) = changes.next() => {
                            save_snapshot(store.as_ref(), &snapshot).await;
                        }
                        _ = &mut stop_rx => break,
                    }
                }
                save_snapshot(store.as_ref(), &latest.get()).await;
                debug!("Snapshot persistence stopped");
            }
            .in_current_span(),
        );

        if let Some(previous) = self.persistence.replace(Persistence { stop_tx, handle }) {
            let _ = previous.stop_tx.send(());
        }
    }

    /// Run `command` and return the snapshot after it took effect.
    ///
    /// # Errors
    /// Returns error if the arguments are invalid or the player has stopped
    pub async fn execute(&self, command: PlayerCommand) -> Result<PlayerSnapshot, PlayerError> {
        command.validate()?;

        let (respond_to, response) = oneshot::channel();
        self.command_tx
            .send(PlayerMessage::Command {
                command,
                respond_to,
            })
            .map_err(|_| PlayerError::ServiceUnavailable)?;

        response.await.map_err(|_| PlayerError::ServiceUnavailable)
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> PlayerSnapshot {
        self.snapshot.get()
    }

    /// Current snapshot followed by every change.
    pub fn watch(&self) -> impl Stream<Item = PlayerSnapshot> + Send + use<> {
        self.snapshot.watch()
    }

    /// Controls currently on offer.
    pub fn capabilities(&self) -> SupportedFeatures {
        SupportedFeatures::from_bits_truncate(self.snapshot.get().supported_features)
    }

    /// Leave the off state.
    ///
    /// # Errors
    /// Returns error if the player has stopped
    pub async fn turn_on(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.execute(PlayerCommand::TurnOn).await
    }

    /// Clear media and switch off.
    ///
    /// # Errors
    /// Returns error if the player has stopped
    pub async fn turn_off(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.execute(PlayerCommand::TurnOff).await
    }

    /// Resume loaded media.
    ///
    /// # Errors
    /// Returns error if the player has stopped
    pub async fn play(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.execute(PlayerCommand::Play).await
    }

    /// Pause loaded media.
    ///
    /// # Errors
    /// Returns error if the player has stopped
    pub async fn pause(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.execute(PlayerCommand::Pause).await
    }

    /// Stop and unload media.
    ///
    /// # Errors
    /// Returns error if the player has stopped
    pub async fn stop(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.execute(PlayerCommand::Stop).await
    }

    /// Move to `position` seconds.
    ///
    /// # Errors
    /// Returns error if `position` is negative or not finite, or the player has stopped
    pub async fn seek(&self, position: f64) -> Result<PlayerSnapshot, PlayerError> {
        self.execute(PlayerCommand::Seek { position }).await
    }

    /// Set the volume level.
    ///
    /// # Errors
    /// Returns error if `level` is outside `[0, 1]`, or the player has stopped
    pub async fn set_volume(&self, level: f64) -> Result<PlayerSnapshot, PlayerError> {
        self.execute(PlayerCommand::SetVolume { level }).await
    }

    /// Mute or unmute.
    ///
    /// # Errors
    /// Returns error if the player has stopped
    pub async fn mute(&self, muted: bool) -> Result<PlayerSnapshot, PlayerError> {
        self.execute(PlayerCommand::Mute { muted }).await
    }

    /// Change repeat mode.
    ///
    /// # Errors
    /// Returns error if the player has stopped
    pub async fn set_repeat(&self, repeat: RepeatMode) -> Result<PlayerSnapshot, PlayerError> {
        self.execute(PlayerCommand::SetRepeat { repeat }).await
    }

    /// Toggle shuffle.
    ///
    /// # Errors
    /// Returns error if the player has stopped
    pub async fn set_shuffle(&self, shuffle: bool) -> Result<PlayerSnapshot, PlayerError> {
        self.execute(PlayerCommand::SetShuffle { shuffle }).await
    }

    /// Resolve, cache and play media.
    ///
    /// Resolution and cache failures are reported through `last_error` in the
    /// returned snapshot, not as an `Err`.
    ///
    /// # Errors
    /// Returns error if either argument is empty, or the player has stopped
    pub async fn play_media(
        &self,
        media_type: impl Into<String>,
        media_id: impl Into<String>,
    ) -> Result<PlayerSnapshot, PlayerError> {
        self.execute(PlayerCommand::PlayMedia {
            media_type: media_type.into(),
            media_id: media_id.into(),
        })
        .await
    }

    /// Mirror `media_url` into the cache without playing it.
    ///
    /// # Errors
    /// Returns error if the URL is empty, or the player has stopped
    pub async fn preload_media(
        &self,
        media_url: impl Into<String>,
    ) -> Result<PlayerSnapshot, PlayerError> {
        self.execute(PlayerCommand::PreloadMedia {
            media_url: media_url.into(),
        })
        .await
    }

    /// Blank the screen and go idle.
    ///
    /// # Errors
    /// Returns error if the player has stopped
    pub async fn clear_screen(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.execute(PlayerCommand::ClearScreen).await
    }

    /// Feed renderer progress into the player.
    ///
    /// # Errors
    /// Returns error if the player has stopped
    pub async fn report_state(&self, report: StateReport) -> Result<PlayerSnapshot, PlayerError> {
        self.execute(PlayerCommand::ReportState(report)).await
    }

    /// Stop the player task and wait for it to finish.
    ///
    /// When persisting, the last snapshot is saved before this returns.
    pub async fn shutdown(mut self) {
        let _ = self.command_tx.send(PlayerMessage::Shutdown);

        if let Some(handle) = self.actor_handle.take() {
            let _ = handle.await;
        }

        if let Some(persistence) = self.persistence.take() {
            let _ = persistence.stop_tx.send(());
            let _ = persistence.handle.await;
        }
    }
}

struct PlayerActor {
    state: PlaybackState,
    cache: CacheStore,
    resolver: MediaResolver,
    watchdog: FeedbackWatchdog,
    snapshot: Property<PlayerSnapshot>,
    self_tx: mpsc::WeakUnboundedSender<PlayerMessage>,
    load_id: u64,
}

impl PlayerActor {
    async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<PlayerMessage>) {
        debug!("Player started");

        while let Some(message) = command_rx.recv().await {
            let respond_to = match message {
                PlayerMessage::Command {
                    command,
                    respond_to,
                } => self.handle_command(command, respond_to),
                PlayerMessage::MediaLoaded {
                    load_id,
                    outcome,
                    cache_error,
                    respond_to,
                } => {
                    self.finish_load(load_id, outcome, cache_error);
                    Some(respond_to)
                }
                PlayerMessage::Preloaded {
                    outcome,
                    respond_to,
                } => {
                    self.finish_preload(outcome);
                    Some(respond_to)
                }
                PlayerMessage::WatchdogExpired { generation } => {
                    self.handle_expiry(generation);
                    None
                }
                PlayerMessage::Shutdown => break,
            };

            self.publish();
            if let Some(respond_to) = respond_to {
                let _ = respond_to.send(self.state.snapshot());
            }
        }

        self.watchdog.cancel();
        debug!("Player stopped");
    }

    fn publish(&self) {
        self.snapshot.set(self.state.snapshot());
    }

    /// Returns the reply channel when the command completed synchronously.
    fn handle_command(&mut self, command: PlayerCommand, respond_to: Reply) -> Option<Reply> {
        match command {
            PlayerCommand::TurnOn => self.state.turn_on(),
            PlayerCommand::TurnOff => {
                self.supersede_media();
                self.state.turn_off();
                info!("Player turned off");
            }
            PlayerCommand::Play => self.state.play(),
            PlayerCommand::Pause => self.state.pause(),
            PlayerCommand::Stop | PlayerCommand::ClearScreen => {
                self.supersede_media();
                self.state.clear_media();
                info!("Media cleared");
            }
            PlayerCommand::Seek { position } => self.state.seek(position),
            PlayerCommand::SetVolume { level } => self.state.set_volume(level),
            PlayerCommand::Mute { muted } => self.state.set_muted(muted),
            PlayerCommand::SetRepeat { repeat } => self.state.set_repeat(repeat),
            PlayerCommand::SetShuffle { shuffle } => self.state.set_shuffle(shuffle),
            PlayerCommand::PlayMedia {
                media_type,
                media_id,
            } => {
                self.start_load(media_type, media_id, respond_to);
                return None;
            }
            PlayerCommand::PreloadMedia { media_url } => {
                self.start_preload(media_url, respond_to);
                return None;
            }
            PlayerCommand::ReportState(report) => self.apply_report(&report),
        }

        Some(respond_to)
    }

    fn supersede_media(&mut self) {
        self.watchdog.cancel();
        self.load_id += 1;
    }

    fn start_load(&mut self, media_type: String, media_id: String, respond_to: Reply) {
        self.state.clear_error();
        self.supersede_media();

        let Some(tx) = self.self_tx.upgrade() else {
            return;
        };

        let load_id = self.load_id;
        let resolver = self.resolver.clone();
        let cache = self.cache.clone();
        tokio::spawn(
            async move {
                let (outcome, cache_error) =
                    load_media(&resolver, &cache, media_type, media_id).await;
                let _ = tx.send(PlayerMessage::MediaLoaded {
                    load_id,
                    outcome,
                    cache_error,
                    respond_to,
                });
            }
            .in_current_span(),
        );
    }

    fn finish_load(
        &mut self,
        load_id: u64,
        outcome: Result<LoadedMedia, ResolutionError>,
        cache_error: Option<CacheError>,
    ) {
        if load_id != self.load_id {
            debug!(load_id, current = self.load_id, "Discarding superseded media load");
            return;
        }

        match outcome {
            Ok(media) => {
                info!(url = %media.media_url, cached = media.cached_url.is_some(), "Playing media");
                // Feedback that arrived during the load belongs to the old media.
                self.watchdog.cancel();
                self.state.load_media(media);
                if let Some(e) = cache_error {
                    self.state.set_error(e);
                }
            }
            Err(e) => {
                warn!(media_id = %e.media_id, "Could not resolve media");
                self.state.set_error(e);
            }
        }
    }

    fn start_preload(&mut self, media_url: String, respond_to: Reply) {
        self.state.clear_error();

        let Some(tx) = self.self_tx.upgrade() else {
            return;
        };

        let cache = self.cache.clone();
        tokio::spawn(
            async move {
                let outcome = cache.maybe_cache(&media_url).await;
                let _ = tx.send(PlayerMessage::Preloaded {
                    outcome,
                    respond_to,
                });
            }
            .in_current_span(),
        );
    }

    fn finish_preload(&mut self, outcome: Result<Option<String>, CacheError>) {
        match outcome {
            Ok(Some(cached_url)) => {
                debug!(%cached_url, "Preloaded media");
                self.state.store_preloaded(cached_url);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Preload failed");
                self.state.set_error(e);
            }
        }
    }

    fn apply_report(&mut self, report: &StateReport) {
        match self.state.apply_report(report, Instant::now()) {
            ReportOutcome::Applied => {
                self.watchdog.arm();
            }
            ReportOutcome::Discarded => {
                debug!(status = %self.state.status(), "Ignoring feedback while not playing");
            }
        }
    }

    fn handle_expiry(&mut self, generation: u64) {
        if !self.watchdog.is_current(generation) {
            debug!(generation, "Ignoring stale watchdog expiry");
            return;
        }

        if self
            .state
            .expire_progress(self.watchdog.delay(), Instant::now())
        {
            info!("No feedback from front-end, dropping playback progress");
        }
    }
}

async fn save_snapshot(store: &dyn SnapshotStore, snapshot: &PlayerSnapshot) {
    if let Err(e) = store.save(snapshot).await {
        warn!(error = %e, "Failed to persist player snapshot");
    }
}

async fn load_media(
    resolver: &MediaResolver,
    cache: &CacheStore,
    content_type: String,
    content_id: String,
) -> (Result<LoadedMedia, ResolutionError>, Option<CacheError>) {
    let resolved = match resolver.resolve(&content_id).await {
        Ok(url) => url,
        Err(e) => return (Err(e), None),
    };

    let (media_url, cached_url, cache_error) = match cache.maybe_cache(&resolved).await {
        Ok(Some(local)) => (local.clone(), Some(local), None),
        Ok(None) => (resolved, None, None),
        Err(e) => {
            warn!(error = %e, "Caching failed, playing uncached");
            (resolved, None, Some(e))
        }
    };

    let media = LoadedMedia {
        content_type,
        content_id,
        media_url,
        cached_url,
    };
    (Ok(media), cache_error)
}
