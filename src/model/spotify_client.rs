//! Spotify Web API client wrapper

use std::sync::Arc;

use rspotify::{
    model::{FullTrack, PlayableId, PlayableItem, PlaylistId, SearchResult, SearchType, TimeRange, TrackId},
    prelude::*,
    AuthCodeSpotify, Config, Token,
};
use tokio::sync::RwLock;

use crate::config::SpotifySettings;
use crate::error::{classify_spotify_error, PlayerError, PlayerResult};

use super::track::{Playlist, SharedTrack, SourceHandle, Track};

pub const SEARCH_LIMIT: u32 = 20;
pub const PLAYLIST_LIMIT: u32 = 20;
pub const TOP_TRACKS_LIMIT: u32 = 10;
pub const PLAYLIST_TRACKS_LIMIT: u32 = 50;

/// Spotify API client with token refresh support
#[derive(Clone)]
pub struct SpotifyClient {
    client: Arc<AuthCodeSpotify>,
    settings: SpotifySettings,
    refresh_token: Arc<RwLock<String>>,
    token_expires_at: Arc<RwLock<Option<chrono::DateTime<chrono::Utc>>>>,
}

impl SpotifyClient {
    /// Build the Web API client around an already issued access token.
    pub async fn connect(
        settings: SpotifySettings,
        token: Token,
        refresh_token: String,
    ) -> PlayerResult<Self> {
        let expires_at = token.expires_at;
        let spotify = AuthCodeSpotify::with_config(
            Default::default(),
            Default::default(),
            Config {
                token_cached: false,
                token_refreshing: false,
                ..Default::default()
            },
        );
        Self::store_token(&spotify, token).await?;
        tracing::debug!("rspotify client initialized");

        Ok(Self {
            client: Arc::new(spotify),
            settings,
            refresh_token: Arc::new(RwLock::new(refresh_token)),
            token_expires_at: Arc::new(RwLock::new(expires_at)),
        })
    }

    async fn store_token(spotify: &AuthCodeSpotify, token: Token) -> PlayerResult<()> {
        let mut guard = spotify
            .token
            .lock()
            .await
            .map_err(|_| PlayerError::Auth("token store unavailable".to_string()))?;
        *guard = Some(token);
        Ok(())
    }

    /// Spotify user id of the signed-in account, used as the greeting name too.
    pub async fn current_user(&self) -> PlayerResult<(String, String)> {
        let user = self.client.me().await.map_err(classify_spotify_error)?;
        let id = user.id.id().to_string();
        let name = user.display_name.unwrap_or_else(|| id.clone());
        tracing::info!(user_id = %id, "rspotify authorized successfully");
        Ok((id, name))
    }

    pub async fn token_needs_refresh(&self) -> bool {
        let expires_at = self.token_expires_at.read().await;
        if let Some(exp) = *expires_at {
            let remaining = exp - chrono::Utc::now();
            // Refresh if less than 5 minutes remaining
            remaining.num_seconds() < 300
        } else {
            false
        }
    }

    pub async fn refresh_token_if_needed(&self) -> PlayerResult<bool> {
        if !self.token_needs_refresh().await {
            return Ok(false);
        }

        let refresh_token = self.refresh_token.read().await.clone();
        tracing::info!("Token expiring soon, refreshing...");

        let (access_token, new_refresh_token, expires_at) =
            crate::auth::refresh_access_token(&self.settings, &refresh_token)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to refresh token");
                    PlayerError::Auth(e.to_string())
                })?;

        Self::store_token(&self.client, crate::auth::rspotify_token(access_token, expires_at)).await?;
        *self.refresh_token.write().await = new_refresh_token;
        *self.token_expires_at.write().await = Some(expires_at);

        tracing::info!("Token refreshed successfully");
        Ok(true)
    }

    // ========================================================================
    // Playback on our Connect device
    // ========================================================================

    pub async fn play_uri_on_device(&self, uri: &str, device_id: &str) -> PlayerResult<()> {
        tracing::debug!(uri, device_id, "API: start_uris_playback");
        let track_id = uri.rsplit(':').next().unwrap_or(uri);
        let id = TrackId::from_id(track_id)
            .map_err(|e| PlayerError::ResolutionFailed(format!("{uri}: {e}")))?;
        self.client
            .start_uris_playback([PlayableId::Track(id)], Some(device_id), None, None)
            .await
            .map_err(classify_spotify_error)
    }

    pub async fn pause(&self, device_id: &str) -> PlayerResult<()> {
        tracing::debug!(device_id, "API: pause_playback");
        self.client
            .pause_playback(Some(device_id))
            .await
            .map_err(classify_spotify_error)
    }

    pub async fn resume(&self, device_id: &str) -> PlayerResult<()> {
        tracing::debug!(device_id, "API: resume_playback");
        self.client
            .resume_playback(Some(device_id), None)
            .await
            .map_err(classify_spotify_error)
    }

    pub async fn seek(&self, position_ms: u32, device_id: &str) -> PlayerResult<()> {
        tracing::debug!(position_ms, device_id, "API: seek_track");
        self.client
            .seek_track(
                chrono::Duration::milliseconds(i64::from(position_ms)),
                Some(device_id),
            )
            .await
            .map_err(classify_spotify_error)
    }

    pub async fn set_volume(&self, volume: u8, device_id: &str) -> PlayerResult<()> {
        tracing::debug!(volume, device_id, "API: set_volume");
        self.client
            .volume(volume.min(100), Some(device_id))
            .await
            .map_err(classify_spotify_error)
    }

    // ========================================================================
    // Catalogue
    // ========================================================================

    pub async fn search(&self, query: &str) -> PlayerResult<Vec<SharedTrack>> {
        tracing::debug!(query, "API: search");
        let result = self
            .client
            .search(query, SearchType::Track, None, None, Some(SEARCH_LIMIT), None)
            .await
            .map_err(classify_spotify_error)?;

        Ok(match result {
            SearchResult::Tracks(page) => page.items.into_iter().filter_map(map_full_track).collect(),
            _ => Vec::new(),
        })
    }

    pub async fn user_playlists(&self) -> PlayerResult<Vec<Playlist>> {
        let page = self
            .client
            .current_user_playlists_manual(Some(PLAYLIST_LIMIT), None)
            .await
            .map_err(classify_spotify_error)?;

        Ok(page
            .items
            .into_iter()
            .map(|playlist| Playlist {
                id: playlist.id.id().to_string(),
                name: playlist.name,
                description: String::new(),
                cover_url: playlist.images.first().map(|i| i.url.clone()).unwrap_or_default(),
                tracks: Vec::new(),
            })
            .collect())
    }

    pub async fn top_tracks(&self) -> PlayerResult<Vec<SharedTrack>> {
        let page = self
            .client
            .current_user_top_tracks_manual(Some(TimeRange::ShortTerm), Some(TOP_TRACKS_LIMIT), None)
            .await
            .map_err(classify_spotify_error)?;
        Ok(page.items.into_iter().filter_map(map_full_track).collect())
    }

    pub async fn playlist_tracks(&self, playlist_id: &str) -> PlayerResult<Vec<SharedTrack>> {
        let id = PlaylistId::from_id(playlist_id)
            .map_err(|e| PlayerError::backend(crate::backend::BackendKind::Spotify, e.to_string()))?;
        let page = self
            .client
            .playlist_items_manual(id, None, None, Some(PLAYLIST_TRACKS_LIMIT), None)
            .await
            .map_err(classify_spotify_error)?;

        Ok(page
            .items
            .into_iter()
            .filter_map(|item| match item.track {
                Some(PlayableItem::Track(track)) => map_full_track(track),
                _ => None,
            })
            .collect())
    }
}

/// Convert an API track into our descriptor. Local files (no id) are skipped.
pub fn map_full_track(track: FullTrack) -> Option<SharedTrack> {
    let track_id = track.id.as_ref()?.id().to_string();
    let artists = track
        .artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let duration_secs = (track.duration.num_milliseconds().max(0) / 1000) as u32;
    let cover = track
        .album
        .images
        .first()
        .map(|i| i.url.clone())
        .unwrap_or_default();

    Some(Arc::new(
        Track::new(track_id.clone(), track.name, artists, track.album.name, duration_secs)
            .with_cover(cover)
            .with_source(SourceHandle::Spotify(format!("spotify:track:{track_id}"))),
    ))
}
