//! Spotify playback: Web API commands addressed to our own Connect device,
//! with librespot player events folded back into backend events.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use librespot::playback::player::{PlayerEvent, PlayerEventChannel};
use tokio::task::JoinHandle;

use crate::audio::SpotifyDevice;
use crate::error::{PlayerError, PlayerResult};
use crate::model::{PlaybackTiming, SpotifyClient};

use super::{BackendEvent, BackendKind, EventSender, LoadRequest, PlaybackBackend};

const KIND: BackendKind = BackendKind::Spotify;

/// State shared with the librespot event forwarder.
#[derive(Default)]
struct Shared {
    /// Generation of the loaded URI; 0 when released.
    generation: AtomicU64,
    /// Set once librespot reports the requested URI, so events from the
    /// item that was playing before are not attributed to it.
    confirmed: AtomicBool,
    uri: Mutex<Option<String>>,
    timing: Mutex<PlaybackTiming>,
}

impl Shared {
    fn timing(&self) -> MutexGuard<'_, PlaybackTiming> {
        self.timing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn uri(&self) -> MutexGuard<'_, Option<String>> {
        self.uri.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Generation events currently belong to, if any.
    fn live_generation(&self) -> Option<u64> {
        let generation = self.generation.load(Ordering::SeqCst);
        (generation != 0 && self.confirmed.load(Ordering::SeqCst)).then_some(generation)
    }
}

pub struct SpotifyBackend {
    client: SpotifyClient,
    device: SpotifyDevice,
    shared: Arc<Shared>,
    forwarder: JoinHandle<()>,
}

impl SpotifyBackend {
    pub fn new(client: SpotifyClient, device: SpotifyDevice, events: EventSender) -> Self {
        let shared = Arc::new(Shared::default());
        let forwarder = tokio::spawn(forward_player_events(
            device.event_channel(),
            device.device_id().to_string(),
            shared.clone(),
            events,
        ));
        Self {
            client,
            device,
            shared,
            forwarder,
        }
    }

    pub fn device_id(&self) -> &str {
        self.device.device_id()
    }

    fn ensure_loaded(&self) -> PlayerResult<()> {
        if self.shared.generation.load(Ordering::SeqCst) == 0 {
            return Err(PlayerError::Unsupported("transport control before load"));
        }
        Ok(())
    }
}

async fn forward_player_events(
    mut channel: PlayerEventChannel,
    device_id: String,
    shared: Arc<Shared>,
    events: EventSender,
) {
    tracing::info!("Starting librespot player event listener");
    while let Some(event) = channel.recv().await {
        match event {
            PlayerEvent::TrackChanged { audio_item } => {
                let uri = audio_item.track_id.to_uri().unwrap_or_default();
                let generation = shared.generation.load(Ordering::SeqCst);
                if generation == 0 {
                    continue;
                }
                let expected = shared.uri().clone();
                if expected.as_deref() == Some(uri.as_str()) {
                    tracing::info!(track = %audio_item.name, uri = %uri, "PlayerEvent::TrackChanged");
                    shared.confirmed.store(true, Ordering::SeqCst);
                    shared.timing().duration_ms = audio_item.duration_ms;
                    let _ = events.send(BackendEvent::TrackChanged {
                        generation,
                        uri,
                        duration_ms: audio_item.duration_ms,
                    });
                } else if shared.confirmed.load(Ordering::SeqCst) {
                    // Autoplay or another client moved on from our track.
                    tracing::info!(uri = %uri, "Spotify left the requested track");
                    let _ = events.send(BackendEvent::Ended { kind: KIND, generation });
                }
            }
            PlayerEvent::Playing { position_ms, .. } => {
                tracing::trace!(position_ms, "PlayerEvent::Playing");
                if let Some(generation) = shared.live_generation() {
                    shared.timing().update_position(position_ms, true);
                    let _ = events.send(BackendEvent::StateChanged {
                        kind: KIND,
                        generation,
                        playing: true,
                        position_ms: Some(position_ms),
                    });
                }
            }
            PlayerEvent::Paused { position_ms, .. } => {
                tracing::debug!(position_ms, "PlayerEvent::Paused");
                if let Some(generation) = shared.live_generation() {
                    shared.timing().update_position(position_ms, false);
                    let _ = events.send(BackendEvent::StateChanged {
                        kind: KIND,
                        generation,
                        playing: false,
                        position_ms: Some(position_ms),
                    });
                }
            }
            PlayerEvent::PositionChanged { position_ms, .. } | PlayerEvent::Seeked { position_ms, .. } => {
                if shared.live_generation().is_some() {
                    let mut timing = shared.timing();
                    let playing = timing.is_playing;
                    timing.update_position(position_ms, playing);
                }
            }
            PlayerEvent::EndOfTrack { .. } => {
                tracing::debug!("PlayerEvent::EndOfTrack");
                if let Some(generation) = shared.live_generation() {
                    shared.timing().freeze(false);
                    let _ = events.send(BackendEvent::Ended { kind: KIND, generation });
                }
            }
            PlayerEvent::SessionConnected { .. } => {
                tracing::info!("PlayerEvent::SessionConnected");
                let _ = events.send(BackendEvent::DeviceReady {
                    device_id: device_id.clone(),
                });
            }
            PlayerEvent::SessionDisconnected { .. } => {
                tracing::warn!("PlayerEvent::SessionDisconnected");
                let _ = events.send(BackendEvent::DeviceNotReady);
            }
            _ => {
                tracing::trace!("PlayerEvent: other event received");
            }
        }
    }
    tracing::debug!("Player event listener finished");
}

#[async_trait]
impl PlaybackBackend for SpotifyBackend {
    fn kind(&self) -> BackendKind {
        KIND
    }

    async fn load(&self, request: LoadRequest) -> PlayerResult<()> {
        self.shared.confirmed.store(false, Ordering::SeqCst);
        *self.shared.uri() = Some(request.handle.clone());
        *self.shared.timing() = PlaybackTiming {
            duration_ms: request.duration_ms,
            ..PlaybackTiming::default()
        };
        self.shared.generation.store(request.generation, Ordering::SeqCst);

        self.client
            .play_uri_on_device(&request.handle, self.device_id())
            .await?;
        self.shared.timing().update_position(0, true);
        Ok(())
    }

    async fn pause(&self) -> PlayerResult<()> {
        self.ensure_loaded()?;
        self.shared.timing().freeze(false);
        self.client.pause(self.device_id()).await
    }

    async fn resume(&self) -> PlayerResult<()> {
        self.ensure_loaded()?;
        self.shared.timing().freeze(true);
        self.client.resume(self.device_id()).await
    }

    async fn seek(&self, position: Duration) -> PlayerResult<()> {
        self.ensure_loaded()?;
        let position_ms = position.as_millis().min(u128::from(u32::MAX)) as u32;
        {
            let mut timing = self.shared.timing();
            let playing = timing.is_playing;
            timing.update_position(position_ms, playing);
        }
        self.client.seek(position_ms, self.device_id()).await
    }

    async fn set_volume(&self, volume: u8) -> PlayerResult<()> {
        self.client.set_volume(volume, self.device_id()).await
    }

    async fn release(&self) {
        self.shared.generation.store(0, Ordering::SeqCst);
        self.shared.confirmed.store(false, Ordering::SeqCst);
        *self.shared.uri() = None;
        self.device.stop();
    }

    async fn shutdown(&self) {
        self.release().await;
        self.device.shutdown();
        self.forwarder.abort();
    }

    async fn poll_position(&self) -> Option<(u32, Option<u32>)> {
        if self.shared.generation.load(Ordering::SeqCst) == 0 {
            return None;
        }
        let timing = self.shared.timing();
        let duration = (timing.duration_ms > 0).then_some(timing.duration_ms);
        Some((timing.current_position_ms(), duration))
    }

    fn optimistic_updates(&self) -> bool {
        true
    }
}
