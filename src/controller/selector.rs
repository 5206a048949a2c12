//! Playback source selection.

use crate::backend::BackendKind;
use crate::error::PlayerError;
use crate::model::{SourceHandle, Track};

/// What the selector knows about the world when a track is picked.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelectorContext {
    /// Signed in to Spotify and the Connect device is registered.
    pub spotify_ready: bool,
    /// The YouTube player can be started.
    pub youtube_playback: bool,
    /// Video ids can be looked up by search.
    pub youtube_search: bool,
    pub local_audio: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackPlan {
    Spotify { uri: String },
    YouTube { video_id: String },
    /// Search for a video id first, then play it on YouTube.
    ResolveYouTube { query: String },
    LocalAudio { url: String },
}

impl PlaybackPlan {
    pub fn backend(&self) -> BackendKind {
        match self {
            Self::Spotify { .. } => BackendKind::Spotify,
            Self::YouTube { .. } | Self::ResolveYouTube { .. } => BackendKind::YouTube,
            Self::LocalAudio { .. } => BackendKind::LocalAudio,
        }
    }
}

/// Pick the backend for `track`.
///
/// Remote handles win over local audio: a playable Spotify URI first, then a
/// known video id, then a video search for tracks without a local stream,
/// then the local stream itself.
pub fn plan_playback(track: &Track, ctx: &SelectorContext) -> Result<PlaybackPlan, PlayerError> {
    if let (Some(uri), true) = (track.spotify_uri(), ctx.spotify_ready) {
        return Ok(PlaybackPlan::Spotify { uri: uri.to_string() });
    }

    if ctx.youtube_playback {
        if let Some(video_id) = track.youtube_id() {
            return Ok(PlaybackPlan::YouTube {
                video_id: video_id.to_string(),
            });
        }
        if ctx.youtube_search && track.audio_url().is_none() {
            let query = track.search_query();
            if !query.is_empty() {
                return Ok(PlaybackPlan::ResolveYouTube { query });
            }
        }
    }

    match &track.source {
        Some(SourceHandle::Audio(url)) if ctx.local_audio => Ok(PlaybackPlan::LocalAudio { url: url.clone() }),
        _ => Err(PlayerError::ResolutionFailed(track.title.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> SelectorContext {
        SelectorContext {
            spotify_ready: false,
            youtube_playback: true,
            youtube_search: true,
            local_audio: true,
        }
    }

    fn track(source: Option<SourceHandle>) -> Track {
        let track = Track::new("t1", "Teardrop", "Massive Attack", "Mezzanine", 329);
        match source {
            Some(source) => track.with_source(source),
            None => track,
        }
    }

    #[test]
    fn local_only_track_always_selects_local_audio() {
        let t = track(Some(SourceHandle::Audio("https://x/a.mp3".into())));
        for spotify_ready in [false, true] {
            for youtube in [false, true] {
                let c = SelectorContext {
                    spotify_ready,
                    youtube_playback: youtube,
                    youtube_search: youtube,
                    local_audio: true,
                };
                assert_eq!(
                    plan_playback(&t, &c).unwrap(),
                    PlaybackPlan::LocalAudio {
                        url: "https://x/a.mp3".into()
                    }
                );
            }
        }
    }

    #[test]
    fn spotify_uri_with_ready_device_selects_spotify() {
        let t = track(Some(SourceHandle::Spotify("spotify:track:abc".into())));
        let c = SelectorContext {
            spotify_ready: true,
            ..ctx()
        };
        assert_eq!(plan_playback(&t, &c).unwrap().backend(), BackendKind::Spotify);
    }

    #[test]
    fn unplayable_spotify_uri_falls_back_to_video_search() {
        let t = track(Some(SourceHandle::Spotify("spotify:track:abc".into())));
        assert_eq!(
            plan_playback(&t, &ctx()).unwrap(),
            PlaybackPlan::ResolveYouTube {
                query: "Teardrop Massive Attack".into()
            }
        );
    }

    #[test]
    fn known_video_id_plays_directly() {
        let t = track(Some(SourceHandle::YouTube("u7K72X4eo_s".into())));
        assert_eq!(
            plan_playback(&t, &ctx()).unwrap(),
            PlaybackPlan::YouTube {
                video_id: "u7K72X4eo_s".into()
            }
        );
    }

    #[test]
    fn handle_less_track_searches_when_youtube_is_available() {
        assert_eq!(plan_playback(&track(None), &ctx()).unwrap().backend(), BackendKind::YouTube);
    }

    #[test]
    fn nothing_playable_is_a_resolution_failure() {
        let c = SelectorContext::default();
        assert!(matches!(
            plan_playback(&track(None), &c),
            Err(PlayerError::ResolutionFailed(title)) if title == "Teardrop"
        ));
        let t = track(Some(SourceHandle::Spotify("spotify:track:abc".into())));
        assert!(plan_playback(&t, &c).is_err());
        let t = track(Some(SourceHandle::YouTube("id".into())));
        assert!(plan_playback(&t, &c).is_err());
    }
}
