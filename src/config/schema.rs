use std::path::PathBuf;

use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `STREAMAI__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub spotify: SpotifySettings,
    pub youtube: YouTubeSettings,
    pub llm: LlmSettings,
    pub playback: PlaybackSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpotifySettings {
    /// Disable to never offer the Spotify login.
    pub enabled: bool,
    /// OAuth client id of the registered Spotify application.
    pub client_id: String,
    /// Loopback redirect registered for the client id.
    pub redirect_uri: String,
    /// Name the Connect device announces itself with.
    pub device_name: String,
    /// Directory holding librespot credentials and the refresh token.
    pub cache_dir: PathBuf,
}

impl Default for SpotifySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            client_id: String::new(),
            redirect_uri: "http://127.0.0.1:8898/login".to_string(),
            device_name: "StreamAI".to_string(),
            cache_dir: PathBuf::from(".cache"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct YouTubeSettings {
    pub enabled: bool,
    /// YouTube Data API v3 key, used to resolve video ids.
    pub api_key: String,
    /// mpv executable used as the embedded player.
    pub mpv_path: String,
    /// Open a video window instead of playing audio only.
    pub show_video: bool,
}

impl Default for YouTubeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            mpv_path: "mpv".to_string(),
            show_video: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    /// Number of songs requested per search.
    pub search_count: usize,
    /// Stream attached to LLM search results that carry no source of their own.
    /// Unset means such tracks go through YouTube resolution instead.
    pub fallback_audio_url: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.5-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            search_count: 8,
            fallback_audio_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Starting volume, 0-100.
    pub initial_volume: u8,
    /// Progress polling interval for every backend (milliseconds).
    pub tick_interval_ms: u64,
    /// Quiet period before a volume change is sent to Spotify (milliseconds).
    pub volume_debounce_ms: u64,
    /// Seconds to move when scrubbing with the arrow keys.
    pub seek_step_secs: u64,
    /// Start with the bundled sample tracks in the queue.
    pub sample_queue: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            initial_volume: 50,
            tick_interval_ms: 1000,
            volume_debounce_ms: 300,
            seek_step_secs: 5,
            sample_queue: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub directory: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(".logs"),
        }
    }
}
