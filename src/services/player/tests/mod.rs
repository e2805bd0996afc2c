//! Unit tests for the player module
//!
//! Covers the transition rules of `PlaybackState`, media classification,
//! resolution, the watchdog timer and the actor's message handling.

#![allow(clippy::panic, clippy::unwrap_used)]

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    sync::{Notify, mpsc},
    time::Instant,
};

use super::{
    CacheStore, FeedbackWatchdog, LoadedMedia, MediaResolver, MediaSourceError, MediaSourceHost,
    PassthroughHost, PlaybackState, PlayerCommand, PlayerError, PlayerOptions, PlayerService,
    PlayerSnapshot, PlayerStatus, RepeatMode, ReportOutcome, ResolveContext, StateReport,
    SupportedFeatures, cache::cache_filename, is_playlist, is_still_image,
};

const DELAY: Duration = Duration::from_secs(3);

fn media(content_type: &str, content_id: &str) -> LoadedMedia {
    LoadedMedia {
        content_type: content_type.to_string(),
        content_id: content_id.to_string(),
        media_url: content_id.to_string(),
        cached_url: None,
    }
}

fn playing(content_type: &str, content_id: &str) -> PlaybackState {
    let mut state = PlaybackState::new(false);
    state.load_media(media(content_type, content_id));
    state
}

fn report() -> StateReport {
    StateReport::default()
}

#[test]
fn playlist_detected_by_type_or_extension() {
    assert!(is_playlist(Some("playlist"), None));
    assert!(is_playlist(Some("audio/x-PlayList"), None));
    assert!(is_playlist(Some("audio/mpeg"), Some("https://x/radio.M3U8")));
    assert!(is_playlist(None, Some("/media/local/mix.pls")));
    assert!(is_playlist(None, Some("list.m3u")));
    assert!(!is_playlist(Some("video/mp4"), Some("https://x/a.mp4")));
    assert!(!is_playlist(None, None));
}

#[test]
fn still_image_is_case_insensitive_prefix() {
    assert!(is_still_image(Some("image/jpeg")));
    assert!(is_still_image(Some("IMAGE/png")));
    assert!(is_still_image(Some("image")));
    assert!(!is_still_image(Some("video/mp4")));
    assert!(!is_still_image(None));
}

#[test]
fn unknown_status_labels_fall_back_to_idle() {
    assert_eq!(PlayerStatus::from("playing"), PlayerStatus::Playing);
    assert_eq!(PlayerStatus::from("buffering"), PlayerStatus::Idle);
    assert_eq!(PlayerStatus::Paused.to_string(), "paused");
}

#[test]
fn loading_video_starts_timeline_and_plays() {
    let state = playing("video/mp4", "https://x/a.mp4");

    assert_eq!(state.status, PlayerStatus::Playing);
    assert_eq!(state.position, Some(0.0));
    assert_eq!(state.duration, None);
    assert!(state.position_updated_at.is_some());
    assert_eq!(state.shuffle, Some(false));
}

#[test]
fn loading_image_zeroes_timeline_and_drops_repeat() {
    let mut state = PlaybackState::new(false);
    state.repeat = Some(RepeatMode::One);
    state.shuffle = Some(true);

    state.load_media(media("image/jpeg", "https://x/a.jpg"));

    assert_eq!(state.position, Some(0.0));
    assert_eq!(state.duration, Some(0.0));
    assert_eq!(state.position_updated_at, None);
    assert_eq!(state.repeat, None);
    assert_eq!(state.shuffle, Some(false));
    assert_eq!(state.status, PlayerStatus::Playing);
}

#[test]
fn loading_single_item_downgrades_repeat_all() {
    let mut state = playing("audio/x-mpegurl", "https://x/list.m3u");
    state.set_repeat(RepeatMode::All);
    state.set_shuffle(true);

    state.load_media(media("audio/mpeg", "https://x/song.mp3"));

    assert_eq!(state.repeat, Some(RepeatMode::One));
    assert_eq!(state.shuffle, Some(false));
}

#[test]
fn loading_playlist_keeps_repeat_all() {
    let mut state = playing("playlist", "https://x/list.m3u");
    state.set_repeat(RepeatMode::All);

    state.load_media(media("playlist", "https://x/other.m3u"));

    assert_eq!(state.repeat, Some(RepeatMode::All));
}

#[test]
fn play_and_pause_need_media() {
    let mut state = PlaybackState::new(false);

    state.play();
    assert_eq!(state.status, PlayerStatus::Idle);
    state.pause();
    assert_eq!(state.status, PlayerStatus::Idle);

    let mut state = playing("video/mp4", "https://x/a.mp4");
    state.pause();
    assert_eq!(state.status, PlayerStatus::Paused);
    state.play();
    assert_eq!(state.status, PlayerStatus::Playing);
}

#[test]
fn clear_media_resets_everything_but_transport_settings() {
    let mut state = playing("video/mp4", "https://x/a.mp4");
    state.cached_url = Some("/local/cache/a.mp4".to_string());
    state.set_volume(0.4);
    state.apply_report(
        &StateReport {
            media_duration: Some(30.0),
            ..report()
        },
        Instant::now(),
    );

    state.clear_media();

    assert_eq!(state.status, PlayerStatus::Idle);
    assert_eq!(state.media_url, None);
    assert_eq!(state.cached_url, None);
    assert_eq!(state.content_type, None);
    assert_eq!(state.content_id, None);
    assert_eq!(state.position, None);
    assert_eq!(state.duration, None);
    assert_eq!(state.position_updated_at, None);
    assert_eq!(state.volume, Some(0.4));
}

#[test]
fn turn_off_and_on() {
    let mut state = playing("video/mp4", "https://x/a.mp4");

    state.turn_off();
    assert_eq!(state.status, PlayerStatus::Off);
    assert_eq!(state.media_url, None);

    state.turn_on();
    assert_eq!(state.status, PlayerStatus::Idle);

    let mut state = playing("video/mp4", "https://x/a.mp4");
    state.pause();
    state.turn_on();
    assert_eq!(state.status, PlayerStatus::Playing);
}

#[test]
fn seek_applies_without_media() {
    let mut state = PlaybackState::new(false);

    state.seek(42.0);

    assert_eq!(state.position, Some(42.0));
    assert!(state.position_updated_at.is_some());
}

#[test]
fn repeat_ignored_for_images_and_unknown_media() {
    let mut state = PlaybackState::new(false);
    state.set_repeat(RepeatMode::One);
    assert_eq!(state.repeat, None);

    let mut state = playing("image/png", "https://x/a.png");
    for mode in [RepeatMode::Off, RepeatMode::One, RepeatMode::All] {
        state.set_repeat(mode);
        assert_eq!(state.repeat, None);
    }
}

#[test]
fn repeat_all_only_for_playlists() {
    let mut state = playing("video/mp4", "https://x/a.mp4");
    state.set_repeat(RepeatMode::All);
    assert_eq!(state.repeat, Some(RepeatMode::One));
    state.set_repeat(RepeatMode::Off);
    assert_eq!(state.repeat, Some(RepeatMode::Off));

    let mut state = playing("audio/mpeg", "https://x/radio.pls");
    state.set_repeat(RepeatMode::All);
    assert_eq!(state.repeat, Some(RepeatMode::All));
}

#[test]
fn shuffle_forced_off_outside_playlists() {
    let mut state = playing("video/mp4", "https://x/a.mp4");
    state.set_shuffle(true);
    assert_eq!(state.shuffle, Some(false));

    let mut state = playing("playlist", "https://x/list.m3u");
    state.set_shuffle(true);
    assert_eq!(state.shuffle, Some(true));
}

#[test]
fn report_while_idle_clears_progress() {
    let mut state = PlaybackState::new(false);
    state.seek(10.0);

    let outcome = state.apply_report(
        &StateReport {
            media_position: Some(5.0),
            media_duration: Some(60.0),
            volume_level: Some(0.3),
            ..report()
        },
        Instant::now(),
    );

    assert_eq!(outcome, ReportOutcome::Discarded);
    assert_eq!(state.position, None);
    assert_eq!(state.duration, None);
    assert_eq!(state.position_updated_at, None);
    assert_eq!(state.volume, None);
    assert_eq!(state.last_feedback, None);
}

#[test]
fn report_while_off_clears_progress() {
    let mut state = playing("video/mp4", "https://x/a.mp4");
    state.turn_off();
    state.seek(8.0);

    let outcome = state.apply_report(
        &StateReport {
            media_position: Some(9.0),
            media_duration: Some(60.0),
            ..report()
        },
        Instant::now(),
    );

    assert_eq!(outcome, ReportOutcome::Discarded);
    assert_eq!(state.status, PlayerStatus::Off);
    assert_eq!(state.position, None);
    assert_eq!(state.duration, None);
    assert_eq!(state.position_updated_at, None);
}

#[test]
fn report_with_zero_duration_pins_position() {
    let mut state = playing("video/mp4", "https://x/a.mp4");

    let outcome = state.apply_report(
        &StateReport {
            media_position: Some(12.0),
            media_duration: Some(0.0),
            ..report()
        },
        Instant::now(),
    );

    assert_eq!(outcome, ReportOutcome::Applied);
    assert_eq!(state.position, Some(0.0));
    assert_eq!(state.duration, Some(0.0));
    assert_eq!(state.position_updated_at, None);
}

#[test]
fn report_applies_finite_fields_only() {
    let mut state = playing("video/mp4", "https://x/a.mp4");
    let now = Instant::now();

    state.apply_report(
        &StateReport {
            state: Some("playing".to_string()),
            media_position: Some(f64::NAN),
            media_duration: Some(f64::INFINITY),
            volume_level: Some(0.7),
            is_volume_muted: Some(true),
            ..report()
        },
        now,
    );

    assert_eq!(state.position, Some(0.0));
    assert_eq!(state.duration, None);
    assert_eq!(state.volume, Some(0.7));
    assert_eq!(state.muted, Some(true));
    assert_eq!(state.last_feedback, Some(now));

    state.apply_report(
        &StateReport {
            media_position: Some(8.5),
            media_duration: Some(120.0),
            ..report()
        },
        now,
    );
    assert_eq!(state.position, Some(8.5));
    assert_eq!(state.duration, Some(120.0));
}

#[test]
fn reported_repeat_and_shuffle_follow_media_policy() {
    let mut state = playing("video/mp4", "https://x/a.mp4");

    state.apply_report(
        &StateReport {
            repeat: Some(RepeatMode::All),
            shuffle: Some(true),
            ..report()
        },
        Instant::now(),
    );

    assert_eq!(state.repeat, Some(RepeatMode::One));
    assert_eq!(state.shuffle, Some(false));
}

#[test]
fn capabilities_follow_loaded_media() {
    let state = PlaybackState::new(false);
    assert_eq!(state.capabilities(), SupportedFeatures::ALWAYS);

    let state = playing("video/mp4", "https://x/a.mp4");
    let features = state.capabilities();
    assert!(features.contains(SupportedFeatures::STOP | SupportedFeatures::REPEAT_SET));
    assert!(!features.contains(SupportedFeatures::SHUFFLE_SET));

    let state = playing("image/jpeg", "https://x/a.jpg");
    assert!(!state.capabilities().contains(SupportedFeatures::REPEAT_SET));

    let state = playing("playlist", "https://x/list.m3u8");
    assert!(state.capabilities().contains(SupportedFeatures::SHUFFLE_SET));
}

#[test]
fn expiry_respects_elapsed_time_and_images() {
    let mut state = playing("video/mp4", "https://x/a.mp4");
    let reported_at = Instant::now();
    state.apply_report(
        &StateReport {
            media_position: Some(3.0),
            ..report()
        },
        reported_at,
    );

    assert!(!state.expire_progress(DELAY, reported_at + Duration::from_secs(1)));
    assert_eq!(state.position, Some(3.0));

    assert!(state.expire_progress(DELAY, reported_at + DELAY));
    assert_eq!(state.position, None);
    assert_eq!(state.position_updated_at, None);

    let mut image = playing("image/jpeg", "https://x/a.jpg");
    assert!(!image.expire_progress(DELAY, Instant::now() + DELAY));
    assert_eq!(image.duration, Some(0.0));
}

#[test]
fn restore_seeds_state_but_not_errors_or_cache_flag() {
    let snapshot = PlayerSnapshot {
        state: PlayerStatus::Paused,
        media_content_type: Some("video/mp4".to_string()),
        media_content_id: Some("https://x/a.mp4".to_string()),
        media_position: Some(14.0),
        media_duration: Some(60.0),
        volume_level: Some(0.2),
        repeat: Some(RepeatMode::One),
        media_url: Some("https://x/a.mp4".to_string()),
        cache_enabled: false,
        last_error: Some("old".to_string()),
        ..PlayerSnapshot::default()
    };
    let mut state = PlaybackState::new(true);

    let active = state.restore(snapshot);

    assert!(active);
    assert_eq!(state.status, PlayerStatus::Paused);
    assert_eq!(state.position, Some(14.0));
    assert_eq!(state.volume, Some(0.2));
    assert!(state.cache_enabled);
    assert_eq!(state.last_error, None);
}

#[test]
fn restore_of_idle_player_drops_progress() {
    let snapshot = PlayerSnapshot {
        state: PlayerStatus::Idle,
        media_position: Some(14.0),
        media_duration: Some(60.0),
        ..PlayerSnapshot::default()
    };
    let mut state = PlaybackState::new(false);

    assert!(!state.restore(snapshot));
    assert_eq!(state.position, None);
    assert_eq!(state.duration, None);
}

#[test]
fn snapshot_serialises_host_attribute_names() {
    let state = playing("video/mp4", "https://x/a.mp4");

    let value = serde_json::to_value(state.snapshot()).unwrap();

    assert_eq!(value["state"], "playing");
    assert_eq!(value["media_content_type"], "video/mp4");
    assert_eq!(value["shuffle"], false);
    assert_eq!(value["cache_enabled"], false);
    assert_eq!(
        value["supported_features"],
        state.capabilities().bits()
    );
}

#[test]
fn commands_parse_from_tagged_json() {
    let command: PlayerCommand =
        serde_json::from_str(r#"{"command":"set_repeat","repeat":"all"}"#).unwrap();
    assert_eq!(
        command,
        PlayerCommand::SetRepeat {
            repeat: RepeatMode::All
        }
    );

    let command: PlayerCommand =
        serde_json::from_str(r#"{"command":"report_state","media_position":4.5}"#).unwrap();
    let PlayerCommand::ReportState(report) = command else {
        panic!("expected report_state");
    };
    assert_eq!(report.media_position, Some(4.5));
    assert_eq!(report.media_duration, None);

    assert!(serde_json::from_str::<PlayerCommand>(r#"{"command":"rewind"}"#).is_err());
}

#[test]
fn validation_rejects_bad_arguments() {
    let invalid = [
        PlayerCommand::Seek { position: -1.0 },
        PlayerCommand::Seek {
            position: f64::NAN,
        },
        PlayerCommand::SetVolume { level: 1.5 },
        PlayerCommand::PlayMedia {
            media_type: "video/mp4".to_string(),
            media_id: " ".to_string(),
        },
        PlayerCommand::PreloadMedia {
            media_url: String::new(),
        },
    ];
    for command in invalid {
        assert!(
            matches!(command.validate(), Err(PlayerError::Validation { .. })),
            "{command:?} should be rejected"
        );
    }

    assert!(PlayerCommand::SetVolume { level: 0.0 }.validate().is_ok());
    assert!(PlayerCommand::Seek { position: 0.0 }.validate().is_ok());
}

#[test]
fn cache_filename_keeps_path_extension() {
    let name = cache_filename("https://x/a.mp4");
    assert_eq!(name.len(), 64 + ".mp4".len());
    assert!(name.ends_with(".mp4"));

    assert!(cache_filename("https://x/a.mp4?sig=1.2").ends_with(".mp4"));
    assert_eq!(cache_filename("https://x/stream").len(), 64);
    assert_eq!(cache_filename("https://x/.hidden").len(), 64);
    assert_eq!(cache_filename("https://x/dir/").len(), 64);
    assert!(cache_filename("https://x/clip.mp4/").ends_with(".mp4"));
    assert_ne!(
        cache_filename("https://x/a.mp4"),
        cache_filename("https://x/a.mp4?v=2")
    );
}

struct FakeHost {
    urls: HashMap<&'static str, Option<&'static str>>,
    calls: AtomicUsize,
}

impl FakeHost {
    fn new(urls: &[(&'static str, Option<&'static str>)]) -> Arc<Self> {
        Arc::new(Self {
            urls: urls.iter().copied().collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl MediaSourceHost for FakeHost {
    async fn resolve(
        &self,
        media_id: &str,
        _context: &ResolveContext,
    ) -> Result<Option<String>, MediaSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.urls.get(media_id) {
            Some(url) => Ok(url.map(str::to_string)),
            None => Err(MediaSourceError::Unresolvable(media_id.to_string())),
        }
    }

    fn process_play_media_url(&self, url: &str) -> String {
        format!("{url}?authSig=signed")
    }
}

#[tokio::test]
async fn local_library_ids_skip_the_host() {
    let host = FakeHost::new(&[]);
    let resolver = MediaResolver::new(host.clone(), ResolveContext::default());

    let url = resolver
        .resolve("media-source://media_source/local/foo/bar.jpg")
        .await
        .unwrap();

    assert_eq!(url, "/media/local/foo/bar.jpg");
    assert_eq!(host.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn media_source_ids_are_resolved_and_finalised() {
    let host = FakeHost::new(&[
        ("media-source://camera/front", Some("/api/camera_proxy/front")),
        ("media-source://tts/empty", None),
    ]);
    let resolver = MediaResolver::new(host.clone(), ResolveContext::default());

    let url = resolver.resolve("media-source://camera/front").await.unwrap();
    assert_eq!(url, "/api/camera_proxy/front?authSig=signed");

    let err = resolver.resolve("media-source://tts/empty").await.unwrap_err();
    assert_eq!(err.to_string(), "Unable to resolve media: media-source://tts/empty");

    let err = resolver.resolve("media-source://nope").await.unwrap_err();
    assert_eq!(err.media_id, "media-source://nope");

    assert_eq!(host.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn plain_urls_pass_through_untouched() {
    let resolver = MediaResolver::new(Arc::new(PassthroughHost), ResolveContext::default());

    for id in ["https://x/a.mp4", "/local/clip.webm", "data:image/png;base64,AAAA"] {
        assert_eq!(resolver.resolve(id).await.unwrap(), id);
    }
    assert!(resolver.resolve("media-source://radio/1").await.is_err());
}

#[tokio::test(start_paused = true)]
async fn watchdog_fires_once_with_latest_generation() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watchdog = FeedbackWatchdog::new(DELAY, move |generation| {
        let _ = tx.send(generation);
    });

    watchdog.arm();
    tokio::time::sleep(Duration::from_secs(2)).await;
    let latest = watchdog.arm();
    assert!(watchdog.is_armed());

    tokio::time::sleep(Duration::from_secs(4)).await;

    assert_eq!(rx.try_recv().unwrap(), latest);
    assert!(rx.try_recv().is_err());
    assert!(watchdog.is_current(latest));
    assert!(!watchdog.is_armed());
}

#[tokio::test(start_paused = true)]
async fn cancelled_watchdog_stays_quiet() {
    let (tx, mut rx) = mpsc::unbounded_channel::<u64>();
    let mut watchdog = FeedbackWatchdog::new(DELAY, move |generation| {
        let _ = tx.send(generation);
    });

    let armed = watchdog.arm();
    watchdog.cancel();
    watchdog.cancel();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(rx.try_recv().is_err());
    assert!(!watchdog.is_current(armed));
}

fn start_player(host: Arc<dyn MediaSourceHost>, restore: Option<PlayerSnapshot>) -> PlayerService {
    PlayerService::start(PlayerOptions {
        entity_name: "test".to_string(),
        cache: CacheStore::disabled(),
        resolver: MediaResolver::new(host, ResolveContext::default()),
        feedback_timeout: DELAY,
        restore,
    })
}

#[tokio::test(start_paused = true)]
async fn silence_after_feedback_clears_progress() {
    let player = start_player(Arc::new(PassthroughHost), None);
    player.play_media("video/mp4", "https://x/a.mp4").await.unwrap();

    let snapshot = player
        .report_state(StateReport {
            media_position: Some(5.0),
            media_duration: Some(60.0),
            ..report()
        })
        .await
        .unwrap();
    assert_eq!(snapshot.media_position, Some(5.0));

    tokio::time::sleep(Duration::from_secs(4)).await;
    let snapshot = player.set_volume(0.5).await.unwrap();

    assert_eq!(snapshot.state, PlayerStatus::Playing);
    assert_eq!(snapshot.media_position, None);
    assert_eq!(snapshot.media_duration, None);
    assert_eq!(snapshot.media_position_updated_at, None);
    assert_eq!(snapshot.media_url.as_deref(), Some("https://x/a.mp4"));
}

#[tokio::test(start_paused = true)]
async fn steady_feedback_keeps_progress() {
    let player = start_player(Arc::new(PassthroughHost), None);
    player.play_media("video/mp4", "https://x/a.mp4").await.unwrap();

    for second in 1..=5 {
        player
            .report_state(StateReport {
                media_position: Some(f64::from(second)),
                media_duration: Some(60.0),
                ..report()
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    let snapshot = player.snapshot();
    assert_eq!(snapshot.media_position, Some(5.0));
    assert_eq!(snapshot.media_duration, Some(60.0));
}

#[tokio::test(start_paused = true)]
async fn clear_cancels_watchdog() {
    let player = start_player(Arc::new(PassthroughHost), None);
    player.play_media("video/mp4", "https://x/a.mp4").await.unwrap();
    player
        .report_state(StateReport {
            media_position: Some(5.0),
            ..report()
        })
        .await
        .unwrap();

    let snapshot = player.clear_screen().await.unwrap();
    assert_eq!(snapshot.state, PlayerStatus::Idle);
    assert_eq!(snapshot.media_url, None);

    player.seek(7.0).await.unwrap();
    tokio::time::sleep(Duration::from_secs(4)).await;
    let snapshot = player.mute(false).await.unwrap();

    assert_eq!(snapshot.media_position, Some(7.0));
}

#[tokio::test(start_paused = true)]
async fn new_media_cancels_watchdog() {
    let player = start_player(Arc::new(PassthroughHost), None);
    player.play_media("video/mp4", "https://x/a.mp4").await.unwrap();
    player
        .report_state(StateReport {
            media_position: Some(5.0),
            ..report()
        })
        .await
        .unwrap();

    player.play_media("video/mp4", "https://x/b.mp4").await.unwrap();
    tokio::time::sleep(Duration::from_secs(4)).await;
    let snapshot = player.mute(true).await.unwrap();

    assert_eq!(snapshot.media_content_id.as_deref(), Some("https://x/b.mp4"));
    assert_eq!(snapshot.media_position, Some(0.0));
    assert!(snapshot.media_position_updated_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn report_while_off_is_discarded() {
    let player = start_player(Arc::new(PassthroughHost), None);
    player.play_media("video/mp4", "https://x/a.mp4").await.unwrap();
    player.turn_off().await.unwrap();

    let snapshot = player
        .report_state(StateReport {
            media_position: Some(12.0),
            media_duration: Some(60.0),
            ..report()
        })
        .await
        .unwrap();

    assert_eq!(snapshot.state, PlayerStatus::Off);
    assert_eq!(snapshot.media_position, None);
    assert_eq!(snapshot.media_duration, None);
    assert_eq!(snapshot.media_position_updated_at, None);
}

#[tokio::test(start_paused = true)]
async fn restored_playback_expires_without_feedback() {
    let restore = PlayerSnapshot {
        state: PlayerStatus::Playing,
        media_content_type: Some("video/mp4".to_string()),
        media_content_id: Some("https://x/a.mp4".to_string()),
        media_url: Some("https://x/a.mp4".to_string()),
        media_position: Some(33.0),
        media_duration: Some(90.0),
        ..PlayerSnapshot::default()
    };
    let player = start_player(Arc::new(PassthroughHost), Some(restore));
    assert_eq!(player.snapshot().media_position, Some(33.0));

    tokio::time::sleep(Duration::from_secs(4)).await;
    let snapshot = player.set_volume(0.1).await.unwrap();

    assert_eq!(snapshot.state, PlayerStatus::Playing);
    assert_eq!(snapshot.media_position, None);
    assert_eq!(snapshot.media_duration, None);
}

#[tokio::test]
async fn resolution_failure_keeps_state() {
    let player = start_player(Arc::new(PassthroughHost), None);
    player.play_media("video/mp4", "https://x/a.mp4").await.unwrap();
    player.pause().await.unwrap();

    let snapshot = player
        .play_media("music", "media-source://radio_browser/abc")
        .await
        .unwrap();

    assert_eq!(snapshot.state, PlayerStatus::Paused);
    assert_eq!(snapshot.media_url.as_deref(), Some("https://x/a.mp4"));
    assert_eq!(
        snapshot.last_error.as_deref(),
        Some("Unable to resolve media: media-source://radio_browser/abc")
    );

    let snapshot = player.seek(3.0).await.unwrap();
    assert!(snapshot.last_error.is_some());

    let snapshot = player.play_media("video/mp4", "https://x/b.mp4").await.unwrap();
    assert_eq!(snapshot.last_error, None);
    assert_eq!(snapshot.state, PlayerStatus::Playing);
}

#[tokio::test]
async fn invalid_commands_never_reach_the_player() {
    let player = start_player(Arc::new(PassthroughHost), None);

    let err = player.set_volume(2.0).await.unwrap_err();
    assert!(matches!(err, PlayerError::Validation { command: "set_volume", .. }));
    assert_eq!(player.snapshot().volume_level, None);
}

#[tokio::test]
async fn capabilities_published_with_snapshot() {
    let player = start_player(Arc::new(PassthroughHost), None);
    assert!(!player.capabilities().contains(SupportedFeatures::STOP));

    player
        .play_media("audio/x-mpegurl", "https://x/list.m3u")
        .await
        .unwrap();

    let features = player.capabilities();
    assert!(features.contains(SupportedFeatures::STOP | SupportedFeatures::SHUFFLE_SET));
    assert!(features.contains(SupportedFeatures::ALWAYS));
}

struct GatedHost {
    started: Notify,
    release: Notify,
}

#[async_trait]
impl MediaSourceHost for GatedHost {
    async fn resolve(
        &self,
        media_id: &str,
        _context: &ResolveContext,
    ) -> Result<Option<String>, MediaSourceError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(Some(format!("https://cdn/{}", media_id.trim_start_matches("media-source://"))))
    }
}

#[tokio::test]
async fn stop_supersedes_pending_load() {
    let host = Arc::new(GatedHost {
        started: Notify::new(),
        release: Notify::new(),
    });
    let player = start_player(host.clone(), None);

    let pending = {
        let player = player.clone();
        tokio::spawn(async move { player.play_media("video/mp4", "media-source://slow/a.mp4").await })
    };
    host.started.notified().await;

    let stopped = player.stop().await.unwrap();
    assert_eq!(stopped.state, PlayerStatus::Idle);

    host.release.notify_one();
    let late = pending.await.unwrap().unwrap();

    assert_eq!(late.state, PlayerStatus::Idle);
    assert_eq!(late.media_url, None);
    assert_eq!(player.snapshot().media_content_id, None);
}

#[tokio::test]
async fn newer_load_wins() {
    let host = Arc::new(GatedHost {
        started: Notify::new(),
        release: Notify::new(),
    });
    let player = start_player(host.clone(), None);

    let first = {
        let player = player.clone();
        tokio::spawn(async move { player.play_media("video/mp4", "media-source://slow/a.mp4").await })
    };
    host.started.notified().await;

    let second = {
        let player = player.clone();
        tokio::spawn(async move { player.play_media("video/mp4", "media-source://slow/b.mp4").await })
    };
    host.started.notified().await;

    host.release.notify_waiters();
    first.await.unwrap().unwrap();
    let snapshot = second.await.unwrap().unwrap();

    assert_eq!(snapshot.media_url.as_deref(), Some("https://cdn/slow/b.mp4"));
    assert_eq!(
        player.snapshot().media_content_id.as_deref(),
        Some("media-source://slow/b.mp4")
    );
}

#[tokio::test(start_paused = true)]
async fn feedback_during_load_does_not_expire_new_media() {
    let host = Arc::new(GatedHost {
        started: Notify::new(),
        release: Notify::new(),
    });
    let player = start_player(host.clone(), None);
    player.play_media("video/mp4", "https://x/a.mp4").await.unwrap();
    player
        .report_state(StateReport {
            media_position: Some(5.0),
            ..report()
        })
        .await
        .unwrap();

    let pending = {
        let player = player.clone();
        tokio::spawn(async move { player.play_media("video/mp4", "media-source://slow/b.mp4").await })
    };
    host.started.notified().await;

    player
        .report_state(StateReport {
            media_position: Some(6.0),
            ..report()
        })
        .await
        .unwrap();

    host.release.notify_one();
    let loaded = pending.await.unwrap().unwrap();
    assert_eq!(loaded.media_url.as_deref(), Some("https://cdn/slow/b.mp4"));
    assert_eq!(loaded.media_position, Some(0.0));

    tokio::time::sleep(Duration::from_secs(4)).await;
    let snapshot = player.mute(true).await.unwrap();

    assert_eq!(snapshot.media_position, Some(0.0));
    assert!(snapshot.media_position_updated_at.is_some());
}

#[tokio::test]
async fn shutdown_stops_the_player() {
    let player = start_player(Arc::new(PassthroughHost), None);
    let other = player.clone();

    player.shutdown().await;

    assert!(matches!(
        other.play().await,
        Err(PlayerError::ServiceUnavailable)
    ));
}
