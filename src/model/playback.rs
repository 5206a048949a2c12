//! Playback session: the single record of what is playing and how far along.

use std::time::Instant;

use crate::backend::BackendKind;
use super::track::SharedTrack;

/// Transport state shown to the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportStatus {
    /// Nothing selected yet.
    #[default]
    Idle,
    /// A lazy lookup (e.g. a video id search) runs before playback can start.
    Resolving,
    Playing,
    Paused,
}

/// Internal timing state for smooth progress bar updates between ticks
#[derive(Clone, Debug)]
pub struct PlaybackTiming {
    pub position_ms: u32,
    pub last_update: Instant,
    pub is_playing: bool,
    pub duration_ms: u32,
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            position_ms: 0,
            last_update: Instant::now(),
            is_playing: false,
            duration_ms: 0,
        }
    }
}

impl PlaybackTiming {
    pub fn current_position_ms(&self) -> u32 {
        let position = if self.is_playing {
            let elapsed = self.last_update.elapsed().as_millis() as u32;
            self.position_ms.saturating_add(elapsed)
        } else {
            self.position_ms
        };
        if self.duration_ms > 0 {
            position.min(self.duration_ms)
        } else {
            position
        }
    }

    /// Overwrite with a backend report. Reports are last-write-wins: backends
    /// poll independently and a seek legitimately moves backwards.
    pub fn update_position(&mut self, position_ms: u32, is_playing: bool) {
        self.position_ms = position_ms;
        self.is_playing = is_playing;
        self.last_update = Instant::now();
    }

    pub fn freeze(&mut self, is_playing: bool) {
        self.position_ms = self.current_position_ms();
        self.is_playing = is_playing;
        self.last_update = Instant::now();
    }
}

/// Everything the UI needs to draw the player bar.
#[derive(Clone, Debug, Default)]
pub struct PlaybackInfo {
    pub track: Option<SharedTrack>,
    pub status: TransportStatus,
    pub backend: Option<BackendKind>,
    pub progress_ms: u32,
    pub duration_ms: u32,
    pub progress_percent: f64,
    pub volume: u8,
}

/// The in-memory playback session.
///
/// `generation` names the current (track, activation) pair. It is bumped on
/// every track switch and every backend report carries the generation it was
/// produced for, so reports from a released backend or a previous track are
/// rejected by identity rather than applied to the new track.
#[derive(Debug)]
pub struct PlaybackSession {
    track: Option<SharedTrack>,
    generation: u64,
    backend: Option<BackendKind>,
    status: TransportStatus,
    timing: PlaybackTiming,
    volume: u8,
    /// End of media already handled for this generation.
    finished: bool,
}

impl PlaybackSession {
    pub fn new(volume: u8) -> Self {
        Self {
            track: None,
            generation: 0,
            backend: None,
            status: TransportStatus::Idle,
            timing: PlaybackTiming::default(),
            volume: volume.min(100),
            finished: false,
        }
    }

    /// Select `track` and return the generation that owns it from now on.
    pub fn begin(&mut self, track: SharedTrack) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.timing = PlaybackTiming {
            duration_ms: track.duration_ms(),
            ..PlaybackTiming::default()
        };
        self.track = Some(track);
        self.backend = None;
        self.status = TransportStatus::Paused;
        self.finished = false;
        self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn track(&self) -> Option<&SharedTrack> {
        self.track.as_ref()
    }

    pub fn backend(&self) -> Option<BackendKind> {
        self.backend
    }

    pub fn status(&self) -> TransportStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.status == TransportStatus::Playing
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
    }

    pub fn is_generation_current(&self, generation: u64) -> bool {
        self.track.is_some() && generation == self.generation
    }

    /// True when a report from `kind` tagged `generation` belongs to this session.
    pub fn is_current(&self, kind: BackendKind, generation: u64) -> bool {
        self.is_generation_current(generation) && self.backend == Some(kind)
    }

    pub fn mark_resolving(&mut self, generation: u64) {
        if self.is_generation_current(generation) {
            self.status = TransportStatus::Resolving;
        }
    }

    /// `kind` now owns playback for `generation`.
    pub fn activate(&mut self, generation: u64, kind: BackendKind) -> bool {
        if !self.is_generation_current(generation) {
            return false;
        }
        self.backend = Some(kind);
        self.status = TransportStatus::Playing;
        self.timing.update_position(0, true);
        true
    }

    /// The active backend reached the end of the track. Returns true only for
    /// the first report, so a backend that signals the end twice advances once.
    pub fn finish(&mut self, kind: BackendKind, generation: u64) -> bool {
        if !self.is_current(kind, generation) || self.finished {
            return false;
        }
        self.finished = true;
        self.status = TransportStatus::Paused;
        let end = self.timing.duration_ms;
        self.timing.update_position(end, false);
        true
    }

    /// Resolution or load failed: keep the track selected but paused.
    pub fn fail(&mut self, generation: u64) {
        if self.is_generation_current(generation) {
            self.backend = None;
            self.status = TransportStatus::Paused;
            self.timing.freeze(false);
        }
    }

    /// Backend released without a replacement (logout, end of queue).
    pub fn release(&mut self) {
        self.backend = None;
        if self.track.is_some() {
            self.status = TransportStatus::Paused;
        }
        self.timing.freeze(false);
    }

    pub fn set_playing(&mut self, playing: bool) {
        if self.track.is_none() {
            return;
        }
        self.status = if playing {
            TransportStatus::Playing
        } else {
            TransportStatus::Paused
        };
        self.timing.freeze(playing);
    }

    pub fn seek_to(&mut self, position_ms: u32) {
        let playing = self.timing.is_playing;
        self.timing.update_position(position_ms, playing);
    }

    /// Apply a progress tick. Returns false when the tick was stale.
    pub fn apply_progress(
        &mut self,
        kind: BackendKind,
        generation: u64,
        position_ms: u32,
        duration_ms: Option<u32>,
    ) -> bool {
        if !self.is_current(kind, generation) {
            return false;
        }
        if let Some(duration) = duration_ms.filter(|d| *d > 0) {
            self.timing.duration_ms = duration;
        }
        let playing = self.timing.is_playing;
        self.timing.update_position(position_ms, playing);
        true
    }

    /// Apply a play/pause report. Returns false when the report was stale.
    pub fn apply_state(
        &mut self,
        kind: BackendKind,
        generation: u64,
        playing: bool,
        position_ms: Option<u32>,
    ) -> bool {
        if !self.is_current(kind, generation) {
            return false;
        }
        self.status = if playing {
            TransportStatus::Playing
        } else {
            TransportStatus::Paused
        };
        match position_ms {
            Some(position) => self.timing.update_position(position, playing),
            None => self.timing.freeze(playing),
        }
        true
    }

    pub fn position_ms(&self) -> u32 {
        self.timing.current_position_ms()
    }

    pub fn duration_ms(&self) -> u32 {
        self.timing.duration_ms
    }

    /// Elapsed over duration, clamped to `[0, 100]`.
    pub fn progress_percent(&self) -> f64 {
        progress_percent(self.position_ms(), self.timing.duration_ms)
    }

    pub fn snapshot(&self) -> PlaybackInfo {
        PlaybackInfo {
            track: self.track.clone(),
            status: self.status,
            backend: self.backend,
            progress_ms: self.position_ms(),
            duration_ms: self.timing.duration_ms,
            progress_percent: self.progress_percent(),
            volume: self.volume,
        }
    }
}

/// Percentage of `position_ms` in `duration_ms`, clamped to `[0, 100]`.
pub fn progress_percent(position_ms: u32, duration_ms: u32) -> f64 {
    if duration_ms == 0 {
        return 0.0;
    }
    (position_ms as f64 / duration_ms as f64 * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::Track;

    fn track(id: &str, secs: u32) -> SharedTrack {
        Arc::new(Track::new(id, id, "artist", "album", secs))
    }

    #[test]
    fn percent_is_clamped_when_backend_overshoots() {
        assert_eq!(progress_percent(250_400, 250_000), 100.0);
        assert_eq!(progress_percent(0, 250_000), 0.0);
        assert_eq!(progress_percent(125_000, 250_000), 50.0);
        assert_eq!(progress_percent(10, 0), 0.0);
    }

    #[test]
    fn session_percent_never_exceeds_hundred() {
        let mut s = PlaybackSession::new(50);
        let generation = s.begin(track("a", 100));
        s.activate(generation, BackendKind::LocalAudio);
        s.apply_state(BackendKind::LocalAudio, generation, false, Some(0));
        assert!(s.apply_progress(BackendKind::LocalAudio, generation, 100_900, Some(100_000)));
        assert_eq!(s.progress_percent(), 100.0);
        assert_eq!(s.snapshot().progress_percent, 100.0);
    }

    #[test]
    fn stale_generation_tick_is_rejected() {
        let mut s = PlaybackSession::new(50);
        let old = s.begin(track("a", 200));
        s.activate(old, BackendKind::Spotify);
        let new = s.begin(track("b", 300));
        s.activate(new, BackendKind::LocalAudio);
        s.apply_state(BackendKind::LocalAudio, new, false, Some(1_000));

        assert!(!s.apply_progress(BackendKind::Spotify, old, 150_000, Some(200_000)));
        assert!(!s.apply_progress(BackendKind::LocalAudio, old, 150_000, Some(200_000)));
        assert_eq!(s.track().map(|t| t.id.as_str()), Some("b"));
        assert_eq!(s.position_ms(), 1_000);
        assert_eq!(s.duration_ms(), 300_000);
    }

    #[test]
    fn tick_from_inactive_backend_is_rejected() {
        let mut s = PlaybackSession::new(50);
        let generation = s.begin(track("a", 200));
        s.activate(generation, BackendKind::YouTube);
        assert!(!s.apply_progress(BackendKind::Spotify, generation, 5_000, None));
        assert!(!s.apply_state(BackendKind::LocalAudio, generation, false, None));
        assert!(s.is_playing());
    }

    #[test]
    fn duplicate_and_out_of_order_ticks_are_last_write_wins() {
        let mut s = PlaybackSession::new(50);
        let generation = s.begin(track("a", 200));
        s.activate(generation, BackendKind::LocalAudio);
        s.apply_state(BackendKind::LocalAudio, generation, false, None);

        s.apply_progress(BackendKind::LocalAudio, generation, 9_000, None);
        s.apply_progress(BackendKind::LocalAudio, generation, 9_000, None);
        s.apply_progress(BackendKind::LocalAudio, generation, 4_000, None);
        assert_eq!(s.position_ms(), 4_000);
    }

    #[test]
    fn failure_leaves_track_selected_but_paused() {
        let mut s = PlaybackSession::new(50);
        let generation = s.begin(track("a", 200));
        s.mark_resolving(generation);
        assert_eq!(s.status(), TransportStatus::Resolving);
        s.fail(generation);
        assert_eq!(s.status(), TransportStatus::Paused);
        assert!(s.backend().is_none());
        assert!(s.track().is_some());
    }

    #[test]
    fn activation_for_superseded_generation_is_ignored() {
        let mut s = PlaybackSession::new(50);
        let old = s.begin(track("a", 200));
        let new = s.begin(track("b", 200));
        assert!(!s.activate(old, BackendKind::LocalAudio));
        assert!(s.backend().is_none());
        assert!(s.activate(new, BackendKind::LocalAudio));
    }

    #[test]
    fn end_of_media_is_handled_once_per_generation() {
        let mut s = PlaybackSession::new(50);
        let generation = s.begin(track("a", 60));
        s.activate(generation, BackendKind::Spotify);
        assert!(s.finish(BackendKind::Spotify, generation));
        assert!(!s.finish(BackendKind::Spotify, generation));
        assert_eq!(s.status(), TransportStatus::Paused);
        assert_eq!(s.position_ms(), 60_000);

        let next = s.begin(track("b", 60));
        assert!(!s.finish(BackendKind::Spotify, generation));
        s.activate(next, BackendKind::Spotify);
        assert!(s.finish(BackendKind::Spotify, next));
    }

    #[test]
    fn volume_is_capped() {
        let mut s = PlaybackSession::new(250);
        assert_eq!(s.volume(), 100);
        s.set_volume(30);
        assert_eq!(s.volume(), 30);
    }
}
