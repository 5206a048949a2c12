use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{AppController, BackendSet, Services};
use crate::backend::{event_channel, BackendEvent, BackendKind, EventReceiver, LoadRequest, PlaybackBackend};
use crate::config::Settings;
use crate::error::{PlayerError, PlayerResult};
use crate::model::{
    AppModel, AuthStatus, ContentView, Direction, ResolvedIdCache, SharedTrack, SourceHandle, Track,
    TransportStatus,
};
use crate::services::{VideoResolver, LYRICS_UNAVAILABLE};

struct FakeBackend {
    kind: BackendKind,
    calls: StdMutex<Vec<String>>,
    load_error: Option<String>,
    load_delay: Duration,
}

impl FakeBackend {
    fn with(kind: BackendKind, load_error: Option<&str>, load_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            kind,
            calls: StdMutex::new(Vec::new()),
            load_error: load_error.map(str::to_string),
            load_delay,
        })
    }

    fn new(kind: BackendKind) -> Arc<Self> {
        Self::with(kind, None, Duration::ZERO)
    }

    fn failing(kind: BackendKind) -> Arc<Self> {
        Self::with(kind, Some("device unavailable"), Duration::ZERO)
    }

    fn slow(kind: BackendKind, load_delay: Duration) -> Arc<Self> {
        Self::with(kind, None, load_delay)
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn loads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with("load "))
            .collect()
    }
}

#[async_trait]
impl PlaybackBackend for FakeBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn load(&self, request: LoadRequest) -> PlayerResult<()> {
        self.record(format!("load {}", request.handle));
        tokio::time::sleep(self.load_delay).await;
        match &self.load_error {
            Some(message) => Err(PlayerError::backend(self.kind, message.clone())),
            None => Ok(()),
        }
    }

    async fn pause(&self) -> PlayerResult<()> {
        self.record("pause");
        Ok(())
    }

    async fn resume(&self) -> PlayerResult<()> {
        self.record("resume");
        Ok(())
    }

    async fn seek(&self, position: Duration) -> PlayerResult<()> {
        self.record(format!("seek {}", position.as_millis()));
        Ok(())
    }

    async fn set_volume(&self, volume: u8) -> PlayerResult<()> {
        self.record(format!("volume {volume}"));
        Ok(())
    }

    async fn release(&self) {
        self.record("release");
    }

    async fn shutdown(&self) {
        self.record("shutdown");
    }

    async fn poll_position(&self) -> Option<(u32, Option<u32>)> {
        None
    }

    fn optimistic_updates(&self) -> bool {
        self.kind == BackendKind::Spotify
    }
}

struct FakeResolver {
    video_id: Option<String>,
    delay: Duration,
    lookups: StdMutex<usize>,
}

impl FakeResolver {
    fn new(video_id: Option<&str>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            video_id: video_id.map(str::to_string),
            delay,
            lookups: StdMutex::new(0),
        })
    }

    fn lookups(&self) -> usize {
        *self.lookups.lock().unwrap()
    }
}

#[async_trait]
impl VideoResolver for FakeResolver {
    async fn resolve(&self, _query: &str) -> PlayerResult<Option<String>> {
        *self.lookups.lock().unwrap() += 1;
        tokio::time::sleep(self.delay).await;
        Ok(self.video_id.clone())
    }
}

struct Harness {
    controller: AppController,
    local: Arc<FakeBackend>,
    youtube: Arc<FakeBackend>,
    resolver: Arc<FakeResolver>,
    _events: EventReceiver,
    _cache_dir: tempfile::TempDir,
}

fn harness_with(resolver: Arc<FakeResolver>, youtube: Arc<FakeBackend>) -> Harness {
    build_harness(FakeBackend::new(BackendKind::LocalAudio), youtube, resolver)
}

fn build_harness(
    local: Arc<FakeBackend>,
    youtube: Arc<FakeBackend>,
    resolver: Arc<FakeResolver>,
) -> Harness {
    let cache_dir = tempfile::tempdir().unwrap();
    let mut settings = Settings::default();
    settings.spotify.cache_dir = cache_dir.path().to_path_buf();
    settings.playback.volume_debounce_ms = 10;

    let (events_tx, events_rx) = event_channel();
    let model = Arc::new(Mutex::new(AppModel::new(&settings.playback)));
    let services = Services {
        backends: BackendSet {
            local: Some(local.clone()),
            youtube: Some(youtube.clone()),
            spotify: None,
        },
        resolver: Some(resolver.clone()),
        resolved_ids: ResolvedIdCache::in_memory(),
        llm: None,
    };
    let controller = AppController::new(model, services, Arc::new(settings), events_tx);
    Harness {
        controller,
        local,
        youtube,
        resolver,
        _events: events_rx,
        _cache_dir: cache_dir,
    }
}

fn harness() -> Harness {
    harness_with(
        FakeResolver::new(Some("vid123"), Duration::ZERO),
        FakeBackend::new(BackendKind::YouTube),
    )
}

fn spotify_track() -> SharedTrack {
    Arc::new(
        Track::new("sp1", "Song", "Band", "LP", 200)
            .with_source(SourceHandle::Spotify("spotify:track:abc".into())),
    )
}

fn bare_track() -> SharedTrack {
    Arc::new(Track::new("llm-1", "Imagined", "Nobody", "None", 180))
}

async fn sample(h: &Harness, index: usize) -> SharedTrack {
    h.controller.model.lock().await.queue.tracks()[index].clone()
}

async fn sign_in(h: &Harness) -> Arc<FakeBackend> {
    sign_in_with(h, FakeBackend::new(BackendKind::Spotify)).await
}

async fn sign_in_with(h: &Harness, spotify: Arc<FakeBackend>) -> Arc<FakeBackend> {
    h.controller
        .install_spotify(spotify.clone(), None, "me".into(), "device-1".into())
        .await;
    spotify
}

#[tokio::test]
async fn local_track_plays_on_local_audio() {
    let h = harness();
    let track = sample(&h, 0).await;

    h.controller.select_and_play(track.clone()).await.unwrap();

    let model = h.controller.model.lock().await;
    assert_eq!(model.session.backend(), Some(BackendKind::LocalAudio));
    assert_eq!(model.session.status(), TransportStatus::Playing);
    assert_eq!(h.local.loads(), vec![format!("load {}", track.audio_url().unwrap())]);
    assert!(h.youtube.calls().is_empty());
}

#[tokio::test]
async fn spotify_wins_only_when_signed_in() {
    let h = harness();

    // Logged out: the Spotify handle is unusable and there is no stream, so
    // the track is looked up on YouTube.
    h.controller.select_and_play(spotify_track()).await.unwrap();
    assert_eq!(h.youtube.loads(), vec!["load vid123".to_string()]);

    let spotify = sign_in(&h).await;
    h.controller.select_and_play(spotify_track()).await.unwrap();

    assert_eq!(spotify.loads(), vec!["load spotify:track:abc".to_string()]);
    assert!(h.youtube.calls().contains(&"release".to_string()));
    let model = h.controller.model.lock().await;
    assert_eq!(model.session.backend(), Some(BackendKind::Spotify));
}

#[tokio::test]
async fn switching_releases_the_previous_backend_first() {
    let h = harness();
    h.controller.select_and_play(bare_track()).await.unwrap();
    h.controller.select_and_play(sample(&h, 1).await).await.unwrap();

    assert_eq!(h.youtube.calls().last().map(String::as_str), Some("release"));
    let model = h.controller.model.lock().await;
    assert_eq!(model.session.backend(), Some(BackendKind::LocalAudio));
}

#[tokio::test]
async fn advancing_wraps_around_the_queue() {
    let h = harness();
    h.controller.select_and_play(sample(&h, 2).await).await.unwrap();

    h.controller.advance(Direction::Next).await;
    assert_eq!(
        h.controller.model.lock().await.session.track().unwrap().id,
        "1"
    );

    h.controller.advance(Direction::Previous).await;
    assert_eq!(
        h.controller.model.lock().await.session.track().unwrap().id,
        "3"
    );
}

#[tokio::test]
async fn ticks_from_a_previous_track_are_dropped() {
    let h = harness();
    h.controller.select_and_play(sample(&h, 0).await).await.unwrap();
    let stale = h.controller.model.lock().await.session.generation();
    h.controller.select_and_play(sample(&h, 1).await).await.unwrap();

    h.controller
        .handle_backend_event(BackendEvent::Tick {
            kind: BackendKind::LocalAudio,
            generation: stale,
            position_ms: 120_000,
            duration_ms: Some(243_000),
        })
        .await;

    let model = h.controller.model.lock().await;
    assert!(model.session.position_ms() < 60_000);
    assert_eq!(model.session.duration_ms(), 230_000);
}

#[tokio::test]
async fn end_of_media_advances_once() {
    let h = harness();
    h.controller.select_and_play(sample(&h, 0).await).await.unwrap();
    let generation = h.controller.model.lock().await.session.generation();
    let ended = BackendEvent::Ended {
        kind: BackendKind::LocalAudio,
        generation,
    };

    h.controller.handle_backend_event(ended.clone()).await;
    h.controller.handle_backend_event(ended).await;

    let model = h.controller.model.lock().await;
    assert_eq!(model.session.track().unwrap().id, "2");
    assert_eq!(model.queue.position(), Some(1));
    assert_eq!(h.local.loads().len(), 2);
}

#[tokio::test]
async fn failed_resolution_pauses_and_shows_a_banner() {
    let h = harness_with(
        FakeResolver::new(None, Duration::ZERO),
        FakeBackend::new(BackendKind::YouTube),
    );

    h.controller.play_track(bare_track()).await;

    let model = h.controller.model.lock().await;
    assert_eq!(model.session.track().unwrap().id, "llm-1");
    assert_eq!(model.session.status(), TransportStatus::Paused);
    assert_eq!(model.session.backend(), None);
    assert!(model.ui.error_message.as_deref().unwrap().contains("Imagined"));
    assert!(h.youtube.calls().is_empty());
}

#[tokio::test]
async fn backend_load_failure_leaves_nothing_active() {
    let h = harness_with(
        FakeResolver::new(Some("vid123"), Duration::ZERO),
        FakeBackend::failing(BackendKind::YouTube),
    );

    let err = h.controller.select_and_play(bare_track()).await.unwrap_err();
    assert!(matches!(err, PlayerError::Backend { .. }));
    assert_eq!(h.youtube.calls(), vec!["load vid123", "release"]);
    let model = h.controller.model.lock().await;
    assert_eq!(model.session.backend(), None);
    assert_eq!(model.session.status(), TransportStatus::Paused);
}

#[tokio::test]
async fn resolving_is_visible_while_the_search_runs() {
    let h = harness_with(
        FakeResolver::new(Some("vid123"), Duration::from_millis(200)),
        FakeBackend::new(BackendKind::YouTube),
    );
    let controller = h.controller.clone();
    let pending = tokio::spawn(async move { controller.select_and_play(bare_track()).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        h.controller.model.lock().await.session.status(),
        TransportStatus::Resolving
    );

    pending.await.unwrap().unwrap();
    assert_eq!(
        h.controller.model.lock().await.session.backend(),
        Some(BackendKind::YouTube)
    );

    // Second play hits the id cache.
    h.controller.select_and_play(bare_track()).await.unwrap();
    assert_eq!(h.resolver.lookups(), 1);
}

#[tokio::test]
async fn logout_stops_all_spotify_traffic() {
    let h = harness();
    let spotify = sign_in(&h).await;
    h.controller.select_and_play(spotify_track()).await.unwrap();

    h.controller.logout().await;
    {
        let model = h.controller.model.lock().await;
        assert_eq!(model.auth, AuthStatus::Unauthenticated);
        assert_eq!(model.device.device_id(), None);
        assert_eq!(model.session.backend(), None);
    }

    h.controller.toggle_play_pause().await;
    h.controller.set_volume(80).await;
    h.controller.advance(Direction::Next).await;

    assert_eq!(spotify.calls().last().map(String::as_str), Some("shutdown"));
    assert_eq!(spotify.loads().len(), 1);
}

#[tokio::test]
async fn rejected_credentials_sign_out_but_local_keeps_working() {
    let h = harness();
    let spotify = sign_in(&h).await;

    h.controller
        .handle_backend_event(BackendEvent::AuthError("401 Unauthorized".into()))
        .await;
    {
        let model = h.controller.model.lock().await;
        assert!(!model.is_authenticated());
        assert!(model.has_error());
    }
    assert_eq!(spotify.calls(), vec!["shutdown"]);

    h.controller.select_and_play(sample(&h, 0).await).await.unwrap();
    assert_eq!(
        h.controller.model.lock().await.session.backend(),
        Some(BackendKind::LocalAudio)
    );
}

#[tokio::test]
async fn errors_from_released_backends_are_ignored() {
    let h = harness();
    h.controller.select_and_play(bare_track()).await.unwrap();
    let stale = h.controller.model.lock().await.session.generation();
    h.controller.select_and_play(sample(&h, 0).await).await.unwrap();

    h.controller
        .handle_backend_event(BackendEvent::PlaybackError {
            kind: BackendKind::YouTube,
            generation: stale,
            message: "mpv exited".into(),
        })
        .await;

    let model = h.controller.model.lock().await;
    assert!(!model.has_error());
    assert_eq!(model.session.status(), TransportStatus::Playing);
}

#[tokio::test]
async fn toggle_pauses_the_active_backend() {
    let h = harness();
    h.controller.select_and_play(sample(&h, 0).await).await.unwrap();

    h.controller.toggle_play_pause().await;
    assert_eq!(
        h.controller.model.lock().await.session.status(),
        TransportStatus::Paused
    );
    h.controller.toggle_play_pause().await;
    assert_eq!(
        h.controller.model.lock().await.session.status(),
        TransportStatus::Playing
    );
    let calls = h.local.calls();
    assert_eq!(&calls[calls.len() - 2..], ["pause", "resume"]);
}

#[tokio::test]
async fn toggle_with_nothing_loaded_starts_the_queue() {
    let h = harness();
    h.controller.toggle_play_pause().await;
    let model = h.controller.model.lock().await;
    assert_eq!(model.session.track().unwrap().id, "1");
    assert_eq!(model.session.backend(), Some(BackendKind::LocalAudio));
}

#[tokio::test]
async fn volume_is_clamped_and_spotify_changes_are_debounced() {
    let h = harness();
    h.controller.select_and_play(sample(&h, 0).await).await.unwrap();
    h.controller.set_volume(150).await;
    assert_eq!(h.controller.model.lock().await.session.volume(), 100);
    assert_eq!(h.local.calls().last().map(String::as_str), Some("volume 100"));

    let spotify = sign_in(&h).await;
    h.controller.select_and_play(spotify_track()).await.unwrap();
    for level in [60, 65, 70] {
        h.controller.set_volume(level).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    let volumes: Vec<_> = spotify
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("volume"))
        .collect();
    assert_eq!(volumes, vec!["volume 70"]);
}

#[tokio::test]
async fn seeking_without_a_backend_is_ignored() {
    let h = harness();
    h.controller.seek_forward().await;
    assert!(h.local.calls().is_empty());

    h.controller.select_and_play(sample(&h, 0).await).await.unwrap();
    h.controller.seek(super::SeekTarget::Fraction(0.5)).await;
    assert_eq!(h.local.calls().last().map(String::as_str), Some("seek 121500"));
}

#[tokio::test]
async fn lyrics_fall_back_without_an_llm_and_can_be_edited() {
    let h = harness();
    h.controller.select_and_play(sample(&h, 0).await).await.unwrap();

    h.controller.toggle_lyrics().await;
    assert_eq!(
        h.controller.model.lock().await.current_lyrics().as_deref(),
        Some(LYRICS_UNAVAILABLE)
    );

    h.controller.start_lyrics_edit().await;
    h.controller.model.lock().await.ui.lyrics.editor = Some("la la la".into());
    h.controller.save_lyrics_edit().await;

    let model = h.controller.model.lock().await;
    assert_eq!(model.current_lyrics().as_deref(), Some("la la la"));
    assert!(model.ui.lyrics.editor.is_none());
}

#[tokio::test]
async fn toggling_while_resolving_is_ignored() {
    let h = harness_with(
        FakeResolver::new(Some("vid123"), Duration::from_millis(200)),
        FakeBackend::new(BackendKind::YouTube),
    );
    let controller = h.controller.clone();
    let pending = tokio::spawn(async move { controller.select_and_play(bare_track()).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    h.controller.toggle_play_pause().await;
    pending.await.unwrap().unwrap();

    assert_eq!(h.resolver.lookups(), 1);
    assert_eq!(h.youtube.loads(), vec!["load vid123".to_string()]);
    assert_eq!(
        h.controller.model.lock().await.session.status(),
        TransportStatus::Playing
    );
}

#[tokio::test]
async fn same_song_from_two_searches_is_looked_up_once() {
    let h = harness();
    let first = Arc::new(Track::new("gemini-1-0", "Imagined", "Nobody", "None", 180));
    let second = Arc::new(Track::new("gemini-2-3", "Imagined", "Nobody", "Other", 181));

    h.controller.select_and_play(first).await.unwrap();
    h.controller.select_and_play(second).await.unwrap();

    assert_eq!(h.resolver.lookups(), 1);
    assert_eq!(h.youtube.loads(), vec!["load vid123", "load vid123"]);
}

#[tokio::test]
async fn logout_waits_for_a_spotify_switch_in_flight() {
    let h = harness();
    let spotify = sign_in_with(
        &h,
        FakeBackend::slow(BackendKind::Spotify, Duration::from_millis(200)),
    )
    .await;
    let controller = h.controller.clone();
    let pending = tokio::spawn(async move { controller.select_and_play(spotify_track()).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    h.controller.logout().await;
    pending.await.unwrap().unwrap();

    let model = h.controller.model.lock().await;
    assert_eq!(model.auth, AuthStatus::Unauthenticated);
    assert_eq!(model.session.backend(), None);
    assert_eq!(spotify.calls(), vec!["load spotify:track:abc", "shutdown"]);
}

#[tokio::test]
async fn local_stream_rejections_keep_the_spotify_session() {
    let h = build_harness(
        FakeBackend::with(
            BackendKind::LocalAudio,
            Some("HTTP status client error (401 Unauthorized) for url (https://cdn.example/a.mp3)"),
            Duration::ZERO,
        ),
        FakeBackend::new(BackendKind::YouTube),
        FakeResolver::new(Some("vid123"), Duration::ZERO),
    );
    let spotify = sign_in(&h).await;

    h.controller.play_track(sample(&h, 0).await).await;

    let model = h.controller.model.lock().await;
    assert!(model.is_authenticated());
    assert!(model.has_error());
    assert!(!model.ui.error_message.as_deref().unwrap().contains("Spotify"));
    assert!(spotify.calls().is_empty());
}

#[test]
fn status_hints_only_describe_spotify_failures() {
    let local = AppController::format_error(&PlayerError::backend(
        BackendKind::LocalAudio,
        "HTTP status client error (404 Not Found)",
    ));
    assert!(!local.contains("Spotify"), "{local}");
    assert!(local.contains("404"));

    let spotify = AppController::format_error(&PlayerError::backend(
        BackendKind::Spotify,
        "http error: status code 404 Not Found",
    ));
    assert!(spotify.contains("device not found"), "{spotify}");
}

#[tokio::test]
async fn picking_a_genre_runs_its_search() {
    let h = harness();
    {
        let mut model = h.controller.model.lock().await;
        model.set_search_results(Vec::new());
        model.move_selection_down();
        model.move_selection_down();
    }

    h.controller.play_selected().await;

    let model = h.controller.model.lock().await;
    assert_eq!(model.ui.search_query, "Lofi music");
    assert_eq!(model.content.view, ContentView::SearchResults);
    assert!(!model.ui.is_searching);
    assert_eq!(model.queue.tracks().len(), 3);
    assert!(h.local.calls().is_empty());
}

#[tokio::test]
async fn reopening_lyrics_while_loading_does_not_fetch_again() {
    let h = harness();
    let track = sample(&h, 0).await;
    h.controller.select_and_play(track.clone()).await.unwrap();
    h.controller.model.lock().await.ui.lyrics.loading = true;

    h.controller.toggle_lyrics().await;

    let model = h.controller.model.lock().await;
    assert!(model.ui.lyrics.visible);
    assert!(model.ui.lyrics.loading);
    assert!(!model.lyrics.contains(&track.id));
}
