//! Search, library, playlists, lyrics and greeting

use crate::model::{genre_query, ContentView, LibraryItem};
use crate::services::LYRICS_UNAVAILABLE;

use super::AppController;

impl AppController {
    /// Search Spotify when signed in, otherwise ask the LLM. Failures leave an
    /// empty result list.
    pub async fn perform_search(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        let client = {
            let mut model = self.model.lock().await;
            model.ui.is_searching = true;
            if model.is_authenticated() {
                model.get_spotify_client()
            } else {
                None
            }
        };

        tracing::info!(query, spotify = client.is_some(), "Searching");
        let results = if let Some(client) = client {
            match client.search(query).await {
                Ok(tracks) => tracks,
                Err(e) => {
                    self.report_error(e).await;
                    Vec::new()
                }
            }
        } else if let Some(llm) = &self.llm {
            llm.search_tracks(query).await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, query, "LLM search failed");
                Vec::new()
            })
        } else {
            Vec::new()
        };

        self.model.lock().await.set_search_results(results);
    }

    /// Playlists and short-term top tracks of the signed-in user. Top tracks
    /// become the queue.
    pub async fn load_library(&self) {
        let Some(client) = self.model.lock().await.get_spotify_client() else {
            return;
        };
        self.model.lock().await.content.is_loading = true;

        let (playlists, top_tracks) = futures::join!(client.user_playlists(), client.top_tracks());

        let mut failure = None;
        {
            let mut model = self.model.lock().await;
            model.content.is_loading = false;
            if !model.is_authenticated() {
                return;
            }
            match playlists {
                Ok(playlists) => {
                    tracing::info!(count = playlists.len(), "Loaded playlists");
                    model.content.playlists = playlists;
                    model.ui.playlist_selected = 0;
                }
                Err(e) => failure = Some(e),
            }
            match top_tracks {
                Ok(tracks) => {
                    tracing::info!(count = tracks.len(), "Loaded top tracks");
                    if !tracks.is_empty() {
                        model.queue.replace(tracks.clone(), None);
                    }
                    model.content.top_tracks = tracks;
                }
                Err(e) => failure = failure.or(Some(e)),
            }
        }
        if let Some(e) = failure {
            self.report_error(e).await;
        }
    }

    pub async fn open_library_item(&self, index: usize) {
        if let Some(item) = LibraryItem::ALL.get(index) {
            self.model.lock().await.open_library_item(*item);
        }
    }

    /// Show a playlist, fetching its tracks the first time.
    pub async fn open_playlist(&self, index: usize) {
        let (needs_fetch, playlist_id, client) = {
            let model = self.model.lock().await;
            let Some(playlist) = model.content.playlists.get(index) else {
                return;
            };
            (
                playlist.tracks.is_empty(),
                playlist.id.clone(),
                model.get_spotify_client(),
            )
        };

        if needs_fetch {
            if let Some(client) = client {
                self.model.lock().await.content.is_loading = true;
                let result = client.playlist_tracks(&playlist_id).await;
                let mut model = self.model.lock().await;
                model.content.is_loading = false;
                match result {
                    Ok(tracks) => {
                        tracing::info!(playlist_id = %playlist_id, count = tracks.len(), "Loaded playlist tracks");
                        if let Some(playlist) = model.content.playlists.get_mut(index) {
                            playlist.tracks = tracks;
                        }
                    }
                    Err(e) => {
                        drop(model);
                        self.report_error(e).await;
                        return;
                    }
                }
            }
        }

        let mut model = self.model.lock().await;
        model.content.show(ContentView::Playlist(index));
        model.ui.active_section = crate::model::ActiveSection::MainContent;
    }

    /// Play the highlighted track, making its list the queue. On the genre
    /// list, search that genre instead.
    pub async fn play_selected(&self) {
        let track = {
            let mut model = self.model.lock().await;
            if let Some(genre) = model.selected_genre() {
                let query = genre_query(genre);
                model.ui.search_query = query.clone();
                drop(model);
                self.perform_search(&query).await;
                return;
            }
            let index = model.content.selected_index;
            model.queue_from_visible(index)
        };
        if let Some(track) = track {
            self.play_track(track).await;
        }
    }

    pub async fn load_greeting(&self) {
        let Some(llm) = &self.llm else {
            return;
        };
        let greeting = llm.greeting().await;
        self.model.lock().await.ui.greeting = greeting;
    }

    // ========================================================================
    // Lyrics overlay
    // ========================================================================

    /// Show or hide lyrics of the current track, fetching them on first show.
    pub async fn toggle_lyrics(&self) {
        let pending = {
            let mut model = self.model.lock().await;
            if model.ui.lyrics.visible {
                model.ui.lyrics.visible = false;
                model.ui.lyrics.editor = None;
                return;
            }
            model.ui.lyrics.visible = true;
            model.ui.lyrics.scroll = 0;
            if model.ui.lyrics.loading {
                return;
            }
            let Some(track) = model.session.track().cloned() else {
                return;
            };
            if model.lyrics.contains(&track.id) || track.lyrics.is_some() {
                return;
            }
            model.ui.lyrics.loading = true;
            track
        };

        let lyrics = match &self.llm {
            Some(llm) => llm.lyrics(&pending.title, &pending.artist).await,
            None => LYRICS_UNAVAILABLE.to_string(),
        };

        let mut model = self.model.lock().await;
        model.lyrics.insert(pending.id.clone(), lyrics);
        model.ui.lyrics.loading = false;
    }

    pub async fn start_lyrics_edit(&self) {
        let mut model = self.model.lock().await;
        if !model.ui.lyrics.visible || model.ui.lyrics.loading {
            return;
        }
        let current = model.current_lyrics().unwrap_or_default();
        model.ui.lyrics.editor = Some(current);
    }

    /// Replace the cached lyrics with the edit buffer.
    pub async fn save_lyrics_edit(&self) {
        let mut model = self.model.lock().await;
        let Some(text) = model.ui.lyrics.editor.take() else {
            return;
        };
        if let Some(track_id) = model.session.track().map(|t| t.id.clone()) {
            tracing::debug!(track_id = %track_id, "Saved edited lyrics");
            model.lyrics.insert(track_id, text);
        }
    }
}
