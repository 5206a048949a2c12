//! Backend event dispatcher

use tokio::task::JoinHandle;

use crate::backend::{BackendEvent, BackendKind, EventReceiver};
use crate::error::PlayerError;
use crate::model::{AuthStatus, DeviceStatus, Direction};

use super::AppController;

impl AppController {
    /// Apply backend events until every sender is gone or the app quits.
    pub fn spawn_event_dispatcher(&self, mut events: EventReceiver) -> JoinHandle<()> {
        let controller = self.clone();
        tracing::info!("Starting backend event dispatcher");
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if controller.model.lock().await.should_quit() {
                    tracing::debug!("Event dispatcher shutting down");
                    break;
                }
                controller.handle_backend_event(event).await;
            }
        })
    }

    pub async fn handle_backend_event(&self, event: BackendEvent) {
        match event {
            BackendEvent::Tick {
                kind,
                generation,
                position_ms,
                duration_ms,
            } => {
                let applied = self
                    .model
                    .lock()
                    .await
                    .session
                    .apply_progress(kind, generation, position_ms, duration_ms);
                if !applied {
                    tracing::trace!(%kind, generation, "Dropped stale progress tick");
                }
            }
            BackendEvent::StateChanged {
                kind,
                generation,
                playing,
                position_ms,
            } => {
                let applied = self
                    .model
                    .lock()
                    .await
                    .session
                    .apply_state(kind, generation, playing, position_ms);
                if applied {
                    tracing::debug!(%kind, playing, "Backend state changed");
                } else {
                    tracing::trace!(%kind, generation, "Dropped stale state change");
                }
            }
            BackendEvent::TrackChanged {
                generation,
                uri,
                duration_ms,
            } => {
                let mut model = self.model.lock().await;
                let position = model.session.position_ms();
                if model
                    .session
                    .apply_progress(BackendKind::Spotify, generation, position, Some(duration_ms))
                {
                    tracing::debug!(uri = %uri, duration_ms, "Spotify confirmed the track");
                }
            }
            BackendEvent::Ended { kind, generation } => {
                let finished = self.model.lock().await.session.finish(kind, generation);
                if finished {
                    tracing::info!(%kind, generation, "End of media, advancing");
                    self.set_ticker(None);
                    self.advance(Direction::Next).await;
                }
            }
            BackendEvent::DeviceReady { device_id } => {
                let mut model = self.model.lock().await;
                if matches!(model.auth, AuthStatus::Authenticated { .. }) {
                    tracing::info!(device_id = %device_id, "Spotify device ready");
                    model.device = DeviceStatus::Ready { device_id };
                }
            }
            BackendEvent::DeviceNotReady => {
                let mut model = self.model.lock().await;
                if matches!(model.auth, AuthStatus::Authenticated { .. }) {
                    tracing::warn!("Spotify device not ready");
                    model.device = DeviceStatus::Connecting;
                }
            }
            BackendEvent::AuthError(message) => {
                self.report_error(PlayerError::Auth(message)).await;
            }
            BackendEvent::PlaybackError {
                kind,
                generation,
                message,
            } => {
                let current = {
                    let mut model = self.model.lock().await;
                    let current = model.session.is_current(kind, generation);
                    if current {
                        model.session.fail(generation);
                    }
                    current
                };
                if current {
                    self.set_ticker(None);
                    self.report_error(PlayerError::backend(kind, message)).await;
                } else {
                    tracing::debug!(%kind, generation, error = %message, "Ignoring error from released backend");
                }
            }
        }
    }
}
