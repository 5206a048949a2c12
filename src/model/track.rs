//! Track and playlist descriptors shared by every view and backend.

use std::sync::Arc;

/// Where a track can be played from.
///
/// A track carries at most one handle, so the enum makes the
/// "one backend handle per track" rule structural.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceHandle {
    /// Direct audio stream: an http(s) URL or a local file path.
    Audio(String),
    /// `spotify:track:<id>` URI.
    Spotify(String),
    /// YouTube video id.
    YouTube(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover_url: String,
    /// Human-readable duration, `M:SS`.
    pub duration: String,
    pub duration_secs: u32,
    pub source: Option<SourceHandle>,
    pub lyrics: Option<String>,
}

pub type SharedTrack = Arc<Track>;

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
        duration_secs: u32,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            cover_url: String::new(),
            duration: format_duration_secs(duration_secs),
            duration_secs,
            source: None,
            lyrics: None,
        }
    }

    pub fn with_source(mut self, source: SourceHandle) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_cover(mut self, cover_url: impl Into<String>) -> Self {
        self.cover_url = cover_url.into();
        self
    }

    pub fn spotify_uri(&self) -> Option<&str> {
        match &self.source {
            Some(SourceHandle::Spotify(uri)) => Some(uri),
            _ => None,
        }
    }

    pub fn youtube_id(&self) -> Option<&str> {
        match &self.source {
            Some(SourceHandle::YouTube(id)) => Some(id),
            _ => None,
        }
    }

    pub fn audio_url(&self) -> Option<&str> {
        match &self.source {
            Some(SourceHandle::Audio(url)) => Some(url),
            _ => None,
        }
    }

    pub fn duration_ms(&self) -> u32 {
        self.duration_secs.saturating_mul(1000)
    }

    /// Text used to look the track up on a video service.
    pub fn search_query(&self) -> String {
        format!("{} {}", self.title, self.artist).trim().to_string()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cover_url: String,
    /// Empty until the playlist is opened.
    pub tracks: Vec<SharedTrack>,
}

/// Format whole seconds as `M:SS`.
pub fn format_duration_secs(total: u32) -> String {
    format!("{}:{:02}", total / 60, total % 60)
}

/// Format milliseconds as `M:SS`, truncating sub-second parts.
pub fn format_duration_ms(ms: u32) -> String {
    format_duration_secs(ms / 1000)
}

/// Parse `M:SS` (or `H:MM:SS`) into seconds.
///
/// Anything that does not look like a colon-separated duration is zero,
/// matching how loosely the LLM fills the field.
pub fn parse_duration(text: &str) -> u32 {
    let text = text.trim();
    if !text.contains(':') {
        return 0;
    }
    text.split(':')
        .map(|part| part.trim().parse::<u32>().unwrap_or(0))
        .fold(0u32, |acc, part| acc.saturating_mul(60).saturating_add(part))
}

/// Tracks available before any account is connected.
pub fn sample_tracks() -> Vec<SharedTrack> {
    const SAMPLE_COVER: &str = "https://image.pollinations.ai/prompt/";
    [
        (
            "1",
            "Midnight City",
            "M83",
            "Hurry Up, We're Dreaming",
            243,
            "city%20lights%20purple%20neon%20night%20sky%20album%20cover",
            "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-1.mp3",
        ),
        (
            "2",
            "Starboy",
            "The Weeknd",
            "Starboy",
            230,
            "dark%20mood%20red%20neon%20cross%20abstract%20album%20cover",
            "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-2.mp3",
        ),
        (
            "3",
            "Neon Lights",
            "Kraftwerk",
            "The Man-Machine",
            341,
            "retro%20computer%20green%20code%20glitch%20art%20album%20cover",
            "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-3.mp3",
        ),
    ]
    .into_iter()
    .map(|(id, title, artist, album, secs, cover, url)| {
        Arc::new(
            Track::new(id, title, artist, album, secs)
                .with_cover(format!(
                    "{SAMPLE_COVER}{cover}?width=512&height=512&nologo=true"
                ))
                .with_source(SourceHandle::Audio(url.to_string())),
        )
    })
    .collect()
}
