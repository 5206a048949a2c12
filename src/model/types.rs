//! Core type definitions for the application

use std::time::Instant;

/// Which section of the UI is currently active/focused
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActiveSection {
    Search,
    Library,
    Playlists,
    MainContent,
}

impl ActiveSection {
    pub fn next(self) -> Self {
        match self {
            ActiveSection::Search => ActiveSection::Library,
            ActiveSection::Library => ActiveSection::Playlists,
            ActiveSection::Playlists => ActiveSection::MainContent,
            ActiveSection::MainContent => ActiveSection::Search,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            ActiveSection::Search => ActiveSection::MainContent,
            ActiveSection::Library => ActiveSection::Search,
            ActiveSection::Playlists => ActiveSection::Library,
            ActiveSection::MainContent => ActiveSection::Playlists,
        }
    }
}

/// Fixed entries of the Library section
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LibraryItem {
    Home,
    Queue,
    SearchResults,
}

impl LibraryItem {
    pub const ALL: [LibraryItem; 3] = [Self::Home, Self::Queue, Self::SearchResults];

    pub fn name(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Queue => "Queue",
            Self::SearchResults => "Search results",
        }
    }
}

/// Whether the Spotify account is usable
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AuthStatus {
    #[default]
    Unauthenticated,
    /// Browser handshake in progress.
    Authenticating,
    Authenticated { user_id: String },
}

/// State of the local Spotify Connect device
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DeviceStatus {
    #[default]
    Disconnected,
    Connecting,
    Ready { device_id: String },
}

impl DeviceStatus {
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Self::Ready { device_id } => Some(device_id),
            _ => None,
        }
    }
}

/// Lyrics overlay state
#[derive(Clone, Debug, Default)]
pub struct LyricsOverlay {
    pub visible: bool,
    pub loading: bool,
    /// Edit buffer while the user rewrites the lyrics.
    pub editor: Option<String>,
    pub scroll: u16,
}

/// UI state for the application
#[derive(Clone, Debug)]
pub struct UiState {
    pub active_section: ActiveSection,
    pub search_query: String,
    pub library_selected: usize,
    pub playlist_selected: usize,
    pub error_message: Option<String>,
    pub error_timestamp: Option<Instant>,
    pub show_help_popup: bool,
    pub lyrics: LyricsOverlay,
    pub greeting: String,
    pub is_searching: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            active_section: ActiveSection::MainContent,
            search_query: String::new(),
            library_selected: 0,
            playlist_selected: 0,
            error_message: None,
            error_timestamp: None,
            show_help_popup: false,
            lyrics: LyricsOverlay::default(),
            greeting: crate::services::DEFAULT_GREETING.to_string(),
            is_searching: false,
        }
    }
}
