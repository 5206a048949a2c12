//! Content view state: which track list fills the main area.

use super::track::{Playlist, SharedTrack};

/// Quick searches offered while there is nothing to list.
pub const GENRES: [&str; 10] = [
    "Pop",
    "Cyberpunk",
    "Lofi",
    "Synthwave",
    "Ambient",
    "Jazz",
    "Deep Focus",
    "Energy",
    "Retro",
    "Future Bass",
];

pub fn genre_query(genre: &str) -> String {
    format!("{genre} music")
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContentView {
    /// Greeting plus top tracks (or the queue when logged out).
    #[default]
    Home,
    Queue,
    SearchResults,
    /// Index into `ContentState::playlists`.
    Playlist(usize),
}

#[derive(Clone, Debug, Default)]
pub struct ContentState {
    pub view: ContentView,
    pub selected_index: usize,
    pub search_results: Vec<SharedTrack>,
    pub playlists: Vec<Playlist>,
    pub top_tracks: Vec<SharedTrack>,
    pub is_loading: bool,
}

impl ContentState {
    /// Tracks of a view other than the queue. `None` for `Queue`, which lives
    /// in the model's queue.
    pub fn tracks_for(&self, view: ContentView) -> Option<&[SharedTrack]> {
        match view {
            ContentView::Home if !self.top_tracks.is_empty() => Some(&self.top_tracks),
            ContentView::Home | ContentView::Queue => None,
            ContentView::SearchResults => Some(&self.search_results),
            ContentView::Playlist(index) => self.playlists.get(index).map(|p| p.tracks.as_slice()),
        }
    }

    /// Whether the genre list stands in for an empty track list.
    pub fn shows_genres(&self, queue_empty: bool) -> bool {
        match self.view {
            ContentView::SearchResults => self.search_results.is_empty(),
            ContentView::Home => self.top_tracks.is_empty() && queue_empty,
            ContentView::Queue | ContentView::Playlist(_) => false,
        }
    }

    pub fn show(&mut self, view: ContentView) {
        if self.view != view {
            self.selected_index = 0;
        }
        self.view = view;
    }

    pub fn clear_account_data(&mut self) {
        self.playlists.clear();
        self.top_tracks.clear();
        if matches!(self.view, ContentView::Playlist(_)) {
            self.show(ContentView::Home);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::track::Track;

    #[test]
    fn genres_fill_empty_search_results_and_an_empty_home() {
        let mut content = ContentState::default();
        assert!(content.shows_genres(true));
        assert!(!content.shows_genres(false));

        content.show(ContentView::SearchResults);
        assert!(content.shows_genres(false));
        content.search_results = vec![Arc::new(Track::new("s1", "t", "a", "b", 60))];
        assert!(!content.shows_genres(false));

        content.show(ContentView::Queue);
        assert!(!content.shows_genres(true));
    }

    #[test]
    fn genre_search_asks_for_music() {
        assert_eq!(genre_query(GENRES[7]), "Energy music");
    }
}
