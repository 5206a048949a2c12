//! Model module - Application state and data types
//!
//! - `types`: UI enums and account/device status
//! - `track`: track and playlist descriptors
//! - `playback`: the playback session and its timing
//! - `queue`: ordered queue with wraparound
//! - `content`: which track list fills the main area
//! - `cache`: resolved video ids and lyrics
//! - `spotify_client`: Spotify Web API wrapper
//! - `app_model`: the state container the controller mutates

mod app_model;
mod cache;
mod content;
mod playback;
mod queue;
mod spotify_client;
mod track;
mod types;

pub use app_model::{AppModel, ViewSnapshot};
pub use cache::ResolvedIdCache;
pub use content::{genre_query, ContentView, GENRES};
pub use playback::{PlaybackInfo, PlaybackTiming, TransportStatus};
pub use queue::Direction;
pub use spotify_client::SpotifyClient;
pub use track::{format_duration_ms, parse_duration, SharedTrack, SourceHandle, Track};
pub use types::{ActiveSection, AuthStatus, DeviceStatus, LibraryItem, UiState};
