//! Main application model with state management

use std::time::Instant;

use crate::config::PlaybackSettings;

use super::cache::LyricsCache;
use super::content::{ContentState, ContentView, GENRES};
use super::playback::{PlaybackInfo, PlaybackSession};
use super::queue::Queue;
use super::spotify_client::SpotifyClient;
use super::track::{sample_tracks, SharedTrack};
use super::types::{ActiveSection, AuthStatus, DeviceStatus, LibraryItem, UiState};

const ERROR_DISPLAY_SECS: u64 = 5;

/// Read-only copy of the model handed to the renderer each frame.
#[derive(Clone, Debug)]
pub struct ViewSnapshot {
    pub playback: PlaybackInfo,
    pub ui: UiState,
    pub content: ContentState,
    pub queue: Vec<SharedTrack>,
    pub queue_position: Option<usize>,
    pub auth: AuthStatus,
    pub device: DeviceStatus,
    pub lyrics: Option<String>,
}

/// Main application model containing all state.
///
/// Only the controller mutates it; the render loop takes snapshots.
pub struct AppModel {
    pub session: PlaybackSession,
    pub queue: Queue,
    pub ui: UiState,
    pub content: ContentState,
    pub lyrics: LyricsCache,
    pub auth: AuthStatus,
    pub device: DeviceStatus,
    pub spotify: Option<SpotifyClient>,
    should_quit: bool,
}

impl AppModel {
    pub fn new(settings: &PlaybackSettings) -> Self {
        let queue = if settings.sample_queue {
            Queue::new(sample_tracks())
        } else {
            Queue::default()
        };
        Self {
            session: PlaybackSession::new(settings.initial_volume),
            queue,
            ui: UiState::default(),
            content: ContentState::default(),
            lyrics: LyricsCache::default(),
            auth: AuthStatus::Unauthenticated,
            device: DeviceStatus::Disconnected,
            spotify: None,
            should_quit: false,
        }
    }

    // ========================================================================
    // Spotify account
    // ========================================================================

    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth, AuthStatus::Authenticated { .. })
    }

    /// Authenticated and the Connect device has registered.
    pub fn is_spotify_ready(&self) -> bool {
        self.is_authenticated() && self.device.device_id().is_some()
    }

    pub fn get_spotify_client(&self) -> Option<SpotifyClient> {
        self.spotify.clone()
    }

    /// Forget every Spotify identifier and the data loaded with it.
    pub fn logout(&mut self) {
        self.auth = AuthStatus::Unauthenticated;
        self.device = DeviceStatus::Disconnected;
        self.spotify = None;
        self.content.clear_account_data();
    }

    // ========================================================================
    // Errors & lifecycle
    // ========================================================================

    pub fn set_error(&mut self, message: String) {
        self.ui.error_message = Some(message);
        self.ui.error_timestamp = Some(Instant::now());
    }

    pub fn clear_error(&mut self) {
        self.ui.error_message = None;
        self.ui.error_timestamp = None;
    }

    pub fn has_error(&self) -> bool {
        self.ui.error_message.is_some()
    }

    pub fn auto_clear_old_errors(&mut self) {
        if let Some(timestamp) = self.ui.error_timestamp {
            if timestamp.elapsed().as_secs() > ERROR_DISPLAY_SECS {
                self.clear_error();
            }
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn set_should_quit(&mut self, quit: bool) {
        self.should_quit = quit;
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn cycle_section_forward(&mut self) {
        self.ui.active_section = self.ui.active_section.next();
    }

    pub fn cycle_section_backward(&mut self) {
        self.ui.active_section = self.ui.active_section.prev();
    }

    pub fn visible_tracks(&self) -> &[SharedTrack] {
        self.content
            .tracks_for(self.content.view)
            .unwrap_or_else(|| self.queue.tracks())
    }

    pub fn shows_genres(&self) -> bool {
        self.content.shows_genres(self.queue.tracks().is_empty())
    }

    /// Genre under the cursor when the genre list is showing.
    pub fn selected_genre(&self) -> Option<&'static str> {
        if !self.shows_genres() {
            return None;
        }
        GENRES.get(self.content.selected_index).copied()
    }

    pub fn move_selection_up(&mut self) {
        match self.ui.active_section {
            ActiveSection::Library => {
                self.ui.library_selected = self.ui.library_selected.saturating_sub(1);
            }
            ActiveSection::Playlists => {
                self.ui.playlist_selected = self.ui.playlist_selected.saturating_sub(1);
            }
            ActiveSection::MainContent => {
                self.content.selected_index = self.content.selected_index.saturating_sub(1);
            }
            ActiveSection::Search => {}
        }
    }

    pub fn move_selection_down(&mut self) {
        match self.ui.active_section {
            ActiveSection::Library => {
                if self.ui.library_selected + 1 < LibraryItem::ALL.len() {
                    self.ui.library_selected += 1;
                }
            }
            ActiveSection::Playlists => {
                if self.ui.playlist_selected + 1 < self.content.playlists.len() {
                    self.ui.playlist_selected += 1;
                }
            }
            ActiveSection::MainContent => {
                let len = if self.shows_genres() {
                    GENRES.len()
                } else {
                    self.visible_tracks().len()
                };
                if self.content.selected_index + 1 < len {
                    self.content.selected_index += 1;
                }
            }
            ActiveSection::Search => {}
        }
    }

    pub fn open_library_item(&mut self, item: LibraryItem) {
        let view = match item {
            LibraryItem::Home => ContentView::Home,
            LibraryItem::Queue => ContentView::Queue,
            LibraryItem::SearchResults => ContentView::SearchResults,
        };
        self.content.show(view);
        if view == ContentView::Queue {
            self.content.selected_index = self.queue.position().unwrap_or(0);
        }
        self.ui.active_section = ActiveSection::MainContent;
    }

    pub fn set_search_results(&mut self, results: Vec<SharedTrack>) {
        self.content.search_results = results;
        self.content.show(ContentView::SearchResults);
        self.content.selected_index = 0;
        self.ui.is_searching = false;
        self.ui.active_section = ActiveSection::MainContent;
    }

    /// Make the list the user picked from the new queue, positioned at `index`.
    pub fn queue_from_visible(&mut self, index: usize) -> Option<SharedTrack> {
        if self.content.view == ContentView::Queue
            || self.content.tracks_for(self.content.view).is_none()
        {
            return self.queue.select(index);
        }
        let tracks = self.visible_tracks().to_vec();
        self.queue.replace(tracks, None);
        self.queue.select(index)
    }

    // ========================================================================
    // Lyrics
    // ========================================================================

    pub fn current_lyrics(&self) -> Option<String> {
        let track = self.session.track()?;
        self.lyrics
            .get(&track.id)
            .map(str::to_string)
            .or_else(|| track.lyrics.clone())
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            playback: self.session.snapshot(),
            ui: self.ui.clone(),
            content: self.content.clone(),
            queue: self.queue.tracks().to_vec(),
            queue_position: self.queue.position(),
            auth: self.auth.clone(),
            device: self.device.clone(),
            lyrics: self.current_lyrics(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::track::{Playlist, Track};

    fn model() -> AppModel {
        AppModel::new(&PlaybackSettings::default())
    }

    #[test]
    fn starts_with_sample_queue_and_no_account() {
        let m = model();
        assert_eq!(m.queue.tracks().len(), 3);
        assert!(!m.is_authenticated());
        assert!(!m.is_spotify_ready());
    }

    #[test]
    fn logout_clears_identifiers_and_account_lists() {
        let mut m = model();
        m.auth = AuthStatus::Authenticated {
            user_id: "me".into(),
        };
        m.device = DeviceStatus::Ready {
            device_id: "dev".into(),
        };
        m.content.playlists.push(Playlist {
            id: "p".into(),
            ..Playlist::default()
        });
        m.content.show(ContentView::Playlist(0));
        assert!(m.is_spotify_ready());

        m.logout();
        assert_eq!(m.auth, AuthStatus::Unauthenticated);
        assert_eq!(m.device.device_id(), None);
        assert!(m.spotify.is_none());
        assert!(m.content.playlists.is_empty());
        assert_eq!(m.content.view, ContentView::Home);
    }

    #[test]
    fn picking_from_search_results_requeues_them() {
        let mut m = model();
        let results: Vec<SharedTrack> = (0..4)
            .map(|i| Arc::new(Track::new(format!("s{i}"), "t", "a", "b", 60)))
            .collect();
        m.set_search_results(results);
        let picked = m.queue_from_visible(2).unwrap();
        assert_eq!(picked.id, "s2");
        assert_eq!(m.queue.tracks().len(), 4);
        assert_eq!(m.queue.position(), Some(2));
    }

    #[test]
    fn lyrics_cache_wins_over_track_lyrics() {
        let mut m = model();
        let mut track = Track::new("x", "t", "a", "b", 60);
        track.lyrics = Some("original".into());
        m.session.begin(Arc::new(track));
        assert_eq!(m.current_lyrics().as_deref(), Some("original"));
        m.lyrics.insert("x", "edited");
        assert_eq!(m.current_lyrics().as_deref(), Some("edited"));
    }

    #[test]
    fn selection_stays_inside_visible_list() {
        let mut m = model();
        m.open_library_item(LibraryItem::Queue);
        for _ in 0..10 {
            m.move_selection_down();
        }
        assert_eq!(m.content.selected_index, 2);
        for _ in 0..10 {
            m.move_selection_up();
        }
        assert_eq!(m.content.selected_index, 0);
    }

    #[test]
    fn empty_search_results_offer_genres() {
        let mut m = model();
        m.set_search_results(Vec::new());
        assert_eq!(m.selected_genre(), Some("Pop"));
        for _ in 0..20 {
            m.move_selection_down();
        }
        assert_eq!(m.selected_genre(), Some("Future Bass"));

        m.set_search_results(vec![Arc::new(Track::new("s1", "t", "a", "b", 60))]);
        assert_eq!(m.selected_genre(), None);
    }
}
