//! Playback control: backend switching and transport commands

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{BackendKind, LoadRequest, PlaybackBackend, ProgressTicker};
use crate::error::{PlayerError, PlayerResult};
use crate::model::{Direction, SharedTrack, SourceHandle, TransportStatus};

use super::selector::{plan_playback, PlaybackPlan, SelectorContext};
use super::AppController;

/// Where to move the playhead.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SeekTarget {
    /// Fraction of the duration, clamped to `[0, 1]`.
    Fraction(f64),
    AbsoluteMs(u32),
    /// Relative jump in seconds from the current position.
    RelativeSecs(i64),
}

impl SeekTarget {
    fn resolve(self, position_ms: u32, duration_ms: u32) -> u32 {
        let target = match self {
            Self::Fraction(f) => (f.clamp(0.0, 1.0) * f64::from(duration_ms)) as u32,
            Self::AbsoluteMs(ms) => ms,
            Self::RelativeSecs(secs) => {
                let target = i64::from(position_ms) + secs.saturating_mul(1000);
                target.clamp(0, i64::from(u32::MAX)) as u32
            }
        };
        if duration_ms > 0 {
            target.min(duration_ms)
        } else {
            target
        }
    }
}

impl AppController {
    async fn selector_context(&self) -> SelectorContext {
        let spotify_ready = self.model.lock().await.is_spotify_ready();
        let backends = self.backends.lock().await;
        SelectorContext {
            spotify_ready: spotify_ready && backends.spotify.is_some(),
            youtube_playback: backends.youtube.is_some(),
            youtube_search: backends.youtube.is_some() && self.resolver.is_some(),
            local_audio: backends.local.is_some(),
        }
    }

    /// Play `track`, reporting failures on the error banner.
    pub async fn play_track(&self, track: SharedTrack) {
        if let Err(e) = self.select_and_play(track).await {
            self.report_error(e).await;
        }
    }

    /// Release whatever is playing, pick a backend for `track` and start it.
    ///
    /// On failure the track stays selected and the session is paused.
    pub async fn select_and_play(&self, track: SharedTrack) -> PlayerResult<()> {
        let _switch = self.switch_lock.lock().await;

        let (generation, volume, previous) = {
            let mut model = self.model.lock().await;
            let previous = model.session.backend();
            let generation = model.session.begin(track.clone());
            // Keep next/previous relative to the selected track.
            model.queue.locate(&track.id);
            (generation, model.session.volume(), previous)
        };
        self.set_ticker(None);
        if let Some(previous) = previous {
            if let Some(backend) = self.backend(previous).await {
                backend.release().await;
            }
        }

        tracing::info!(track = %track.title, artist = %track.artist, generation, "Selecting playback source");

        let ctx = self.selector_context().await;
        let plan = match plan_playback(&track, &ctx) {
            Ok(plan) => plan,
            Err(e) => {
                self.model.lock().await.session.fail(generation);
                return Err(e);
            }
        };

        tracing::debug!(backend = %plan.backend(), generation, "Playback planned");
        let (kind, handle) = match plan {
            PlaybackPlan::Spotify { uri } => (BackendKind::Spotify, uri),
            PlaybackPlan::YouTube { video_id } => (BackendKind::YouTube, video_id),
            PlaybackPlan::LocalAudio { url } => (BackendKind::LocalAudio, url),
            PlaybackPlan::ResolveYouTube { query } => {
                self.model.lock().await.session.mark_resolving(generation);
                match self.resolve_video_id(&query).await {
                    Some(video_id) => (BackendKind::YouTube, video_id),
                    None => {
                        self.model.lock().await.session.fail(generation);
                        return Err(PlayerError::ResolutionFailed(track.title.clone()));
                    }
                }
            }
        };

        let Some(backend) = self.backend(kind).await else {
            self.model.lock().await.session.fail(generation);
            return Err(PlayerError::ResolutionFailed(track.title.clone()));
        };

        let request = LoadRequest {
            generation,
            handle,
            volume,
            duration_ms: track.duration_ms(),
        };
        if let Err(e) = backend.load(request).await {
            tracing::warn!(error = %e, backend = %kind, "Backend failed to load track");
            backend.release().await;
            self.model.lock().await.session.fail(generation);
            return Err(e);
        }

        let activated = self.model.lock().await.session.activate(generation, kind);
        if !activated {
            tracing::debug!(generation, "Track switched while loading, releasing");
            backend.release().await;
            return Ok(());
        }
        self.start_ticker(backend, generation);
        tracing::info!(track = %track.title, backend = %kind, "Playback started");
        Ok(())
    }

    fn start_ticker(&self, backend: Arc<dyn PlaybackBackend>, generation: u64) {
        let interval = Duration::from_millis(self.settings.playback.tick_interval_ms.max(1));
        self.set_ticker(Some(ProgressTicker::spawn(
            backend,
            generation,
            interval,
            self.events.clone(),
        )));
    }

    /// Cached or searched video id for a search query.
    async fn resolve_video_id(&self, query: &str) -> Option<String> {
        if let Some(video_id) = self.resolved_ids.get(query).await {
            tracing::debug!(query, video_id = %video_id, "Video id from cache");
            return Some(video_id);
        }
        let resolver = self.resolver.as_ref()?;
        match resolver.resolve(query).await {
            Ok(Some(video_id)) => {
                self.resolved_ids.insert(query, video_id.clone()).await;
                if let Err(e) = self.resolved_ids.save_to_disk().await {
                    tracing::warn!(error = %e, "Could not persist resolved video ids");
                }
                Some(video_id)
            }
            Ok(None) => {
                tracing::info!(query, "No video found");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, query, "Video search failed");
                None
            }
        }
    }

    /// Pause or resume the active backend. With nothing active, (re)start the
    /// selected track, or the queue.
    pub async fn toggle_play_pause(&self) {
        let (kind, playing, track) = {
            let model = self.model.lock().await;
            if model.session.status() == TransportStatus::Resolving {
                tracing::debug!("Toggle ignored while a video is being looked up");
                return;
            }
            (
                model.session.backend(),
                model.session.is_playing(),
                model
                    .session
                    .track()
                    .cloned()
                    .or_else(|| model.queue.current().cloned())
                    .or_else(|| model.queue.tracks().first().cloned()),
            )
        };

        let backend = match kind {
            Some(kind) => self.backend(kind).await,
            None => None,
        };
        let Some(backend) = backend else {
            if let Some(track) = track {
                self.play_track(track).await;
            }
            return;
        };

        let optimistic = backend.optimistic_updates();
        if optimistic {
            self.model.lock().await.session.set_playing(!playing);
        }
        tracing::debug!(is_playing = playing, backend = %backend.kind(), "Toggling playback");

        let result = if playing {
            backend.pause().await
        } else {
            backend.resume().await
        };
        match result {
            Ok(()) => {
                if !optimistic {
                    self.model.lock().await.session.set_playing(!playing);
                }
                tracing::info!(action = if playing { "paused" } else { "resumed" }, "Playback toggled");
            }
            Err(e) => {
                if optimistic {
                    self.model.lock().await.session.set_playing(playing);
                }
                self.report_error(e).await;
            }
        }
    }

    /// Move the playhead of the active backend. Silently ignored when no
    /// backend is ready.
    pub async fn seek(&self, target: SeekTarget) {
        let (kind, position_ms, duration_ms) = {
            let model = self.model.lock().await;
            (
                model.session.backend(),
                model.session.position_ms(),
                model.session.duration_ms(),
            )
        };
        let backend = match kind {
            Some(kind) => self.backend(kind).await,
            None => None,
        };
        let Some(backend) = backend else {
            tracing::debug!("Seek ignored, no active backend");
            return;
        };

        let target_ms = target.resolve(position_ms, duration_ms);
        match backend.seek(Duration::from_millis(u64::from(target_ms))).await {
            Ok(()) => {
                self.model.lock().await.session.seek_to(target_ms);
                tracing::debug!(position_ms = target_ms, "Seeked");
            }
            Err(e) => self.report_error(e).await,
        }
    }

    /// Step through the queue, wrapping at both ends, and play the new track.
    pub async fn advance(&self, direction: Direction) {
        let next = self.model.lock().await.queue.advance(direction);
        match next {
            Some(track) => {
                tracing::debug!(?direction, track = %track.title, "Advancing queue");
                self.play_track(track).await;
            }
            None => tracing::debug!("Queue is empty, nothing to advance to"),
        }
    }

    /// Clamp to 0-100 and apply to the active backend. Spotify changes are
    /// debounced so a held key sends one request.
    pub async fn set_volume(&self, level: i32) {
        let volume = level.clamp(0, 100) as u8;
        let kind = {
            let mut model = self.model.lock().await;
            model.session.set_volume(volume);
            model.session.backend()
        };
        let Some(kind) = kind else {
            return;
        };
        let Some(backend) = self.backend(kind).await else {
            return;
        };

        if kind == BackendKind::Spotify {
            let delay = Duration::from_millis(self.settings.playback.volume_debounce_ms);
            let controller = self.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                tracing::debug!(volume, "Sending debounced Spotify volume");
                if let Err(e) = backend.set_volume(volume).await {
                    controller.report_error(e).await;
                }
            });
            self.cancel_volume_debounce();
            *self
                .volume_debounce
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(handle);
        } else if let Err(e) = backend.set_volume(volume).await {
            self.report_error(e).await;
        }
    }

    pub async fn volume_up(&self) {
        let current = self.model.lock().await.session.volume();
        self.set_volume(i32::from(current) + 5).await;
    }

    pub async fn volume_down(&self) {
        let current = self.model.lock().await.session.volume();
        self.set_volume(i32::from(current) - 5).await;
    }

    pub async fn seek_forward(&self) {
        let step = self.settings.playback.seek_step_secs as i64;
        self.seek(SeekTarget::RelativeSecs(step)).await;
    }

    pub async fn seek_backward(&self) {
        let step = self.settings.playback.seek_step_secs as i64;
        self.seek(SeekTarget::RelativeSecs(-step)).await;
    }

    /// Short label for where a track would be played from.
    pub fn describe_source(track: &SharedTrack) -> &'static str {
        match track.source {
            Some(SourceHandle::Spotify(_)) => "Spotify",
            Some(SourceHandle::YouTube(_)) => "YouTube",
            Some(SourceHandle::Audio(_)) => "Stream",
            None => "Search",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_targets_resolve_within_the_track() {
        assert_eq!(SeekTarget::Fraction(0.5).resolve(0, 200_000), 100_000);
        assert_eq!(SeekTarget::Fraction(1.7).resolve(0, 200_000), 200_000);
        assert_eq!(SeekTarget::Fraction(-1.0).resolve(5_000, 200_000), 0);
        assert_eq!(SeekTarget::AbsoluteMs(250_000).resolve(0, 200_000), 200_000);
        assert_eq!(SeekTarget::RelativeSecs(-10).resolve(4_000, 200_000), 0);
        assert_eq!(SeekTarget::RelativeSecs(5).resolve(4_000, 200_000), 9_000);
        assert_eq!(SeekTarget::AbsoluteMs(9_000).resolve(0, 0), 9_000);
    }
}
