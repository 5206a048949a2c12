//! Playback backends.
//!
//! Each backend owns one way of producing sound (a rodio sink, the Spotify
//! Connect device, an mpv sidecar) behind [`PlaybackBackend`]. Backends never
//! touch the model: they report through [`BackendEvent`]s tagged with the
//! session generation they were loaded for, and the controller decides
//! whether a report still applies.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::PlayerResult;

pub mod local;
pub mod spotify;
pub mod ticker;
pub mod youtube;

pub use local::LocalAudioBackend;
pub use spotify::SpotifyBackend;
pub use ticker::ProgressTicker;
pub use youtube::YouTubeBackend;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    LocalAudio,
    Spotify,
    YouTube,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LocalAudio => "Local audio",
            Self::Spotify => "Spotify",
            Self::YouTube => "YouTube",
        };
        f.write_str(name)
    }
}

/// Reports flowing from the backends into the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// Periodic position report.
    Tick {
        kind: BackendKind,
        generation: u64,
        position_ms: u32,
        duration_ms: Option<u32>,
    },
    /// Play/pause changed on the backend side.
    StateChanged {
        kind: BackendKind,
        generation: u64,
        playing: bool,
        position_ms: Option<u32>,
    },
    /// The loaded media played to its end.
    Ended { kind: BackendKind, generation: u64 },
    /// Spotify switched the item on our device.
    TrackChanged {
        generation: u64,
        uri: String,
        duration_ms: u32,
    },
    /// The Spotify Connect device is registered and can take commands.
    DeviceReady { device_id: String },
    DeviceNotReady,
    /// Credentials were rejected; the account must be signed out.
    AuthError(String),
    PlaybackError {
        kind: BackendKind,
        generation: u64,
        message: String,
    },
}

pub type EventSender = mpsc::UnboundedSender<BackendEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<BackendEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// What to start playing.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub generation: u64,
    /// Backend specific handle: URL, Spotify URI or video id.
    pub handle: String,
    pub volume: u8,
    /// Duration from the track descriptor, 0 when unknown.
    pub duration_ms: u32,
}

#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Start `request`, replacing whatever this backend was playing.
    async fn load(&self, request: LoadRequest) -> PlayerResult<()>;

    async fn pause(&self) -> PlayerResult<()>;

    async fn resume(&self) -> PlayerResult<()>;

    async fn seek(&self, position: Duration) -> PlayerResult<()>;

    /// `volume` is 0-100.
    async fn set_volume(&self, volume: u8) -> PlayerResult<()>;

    /// Stop and forget the loaded item. No events are emitted afterwards
    /// until the next `load`.
    async fn release(&self);

    /// Tear down devices or processes owned by the backend.
    async fn shutdown(&self);

    /// Current `(position_ms, duration_ms)`, `None` when nothing is loaded.
    async fn poll_position(&self) -> Option<(u32, Option<u32>)>;

    /// Whether transport changes should be shown before the backend confirms them.
    fn optimistic_updates(&self) -> bool {
        false
    }
}
