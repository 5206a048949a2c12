//! Controller module - Application logic and event handling
//!
//! - `selector`: decides which backend plays a track
//! - `playback`: transport control and backend switching
//! - `player_events`: the single consumer of backend events
//! - `navigation`: search, library, playlists, lyrics and greeting
//! - `input`: key event handling
//! - `account`: Spotify login and logout

mod account;
mod input;
mod navigation;
mod playback;
mod player_events;
mod selector;
#[cfg(test)]
mod tests;

use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::backend::{BackendKind, EventSender, PlaybackBackend, ProgressTicker};
use crate::config::Settings;
use crate::error::PlayerError;
use crate::model::{AppModel, ResolvedIdCache};
use crate::services::{GeminiClient, VideoResolver};

pub use playback::SeekTarget;
pub use selector::{plan_playback, PlaybackPlan, SelectorContext};

/// Backends the controller can route to. Spotify only exists while signed in.
#[derive(Clone, Default)]
pub struct BackendSet {
    pub local: Option<Arc<dyn PlaybackBackend>>,
    pub youtube: Option<Arc<dyn PlaybackBackend>>,
    pub spotify: Option<Arc<dyn PlaybackBackend>>,
}

impl BackendSet {
    pub fn get(&self, kind: BackendKind) -> Option<Arc<dyn PlaybackBackend>> {
        match kind {
            BackendKind::LocalAudio => self.local.clone(),
            BackendKind::YouTube => self.youtube.clone(),
            BackendKind::Spotify => self.spotify.clone(),
        }
    }

    fn all(&self) -> impl Iterator<Item = &Arc<dyn PlaybackBackend>> {
        [&self.local, &self.youtube, &self.spotify]
            .into_iter()
            .flatten()
    }
}

/// External collaborators handed to the controller at startup.
pub struct Services {
    pub backends: BackendSet,
    pub resolver: Option<Arc<dyn VideoResolver>>,
    pub resolved_ids: ResolvedIdCache,
    pub llm: Option<GeminiClient>,
}

#[derive(Clone)]
pub struct AppController {
    pub(crate) model: Arc<Mutex<AppModel>>,
    pub(crate) backends: Arc<Mutex<BackendSet>>,
    resolver: Option<Arc<dyn VideoResolver>>,
    resolved_ids: ResolvedIdCache,
    llm: Option<GeminiClient>,
    settings: Arc<Settings>,
    events: EventSender,
    /// Serializes track switches so only one backend is ever activated.
    switch_lock: Arc<Mutex<()>>,
    ticker: Arc<StdMutex<Option<ProgressTicker>>>,
    volume_debounce: Arc<StdMutex<Option<JoinHandle<()>>>>,
}

impl AppController {
    pub fn new(
        model: Arc<Mutex<AppModel>>,
        services: Services,
        settings: Arc<Settings>,
        events: EventSender,
    ) -> Self {
        Self {
            model,
            backends: Arc::new(Mutex::new(services.backends)),
            resolver: services.resolver,
            resolved_ids: services.resolved_ids,
            llm: services.llm,
            settings,
            events,
            switch_lock: Arc::new(Mutex::new(())),
            ticker: Arc::new(StdMutex::new(None)),
            volume_debounce: Arc::new(StdMutex::new(None)),
        }
    }

    pub(crate) async fn backend(&self, kind: BackendKind) -> Option<Arc<dyn PlaybackBackend>> {
        self.backends.lock().await.get(kind)
    }

    pub(crate) fn set_ticker(&self, ticker: Option<ProgressTicker>) {
        let previous = std::mem::replace(
            &mut *self.ticker.lock().unwrap_or_else(PoisonError::into_inner),
            ticker,
        );
        // Dropping aborts the previous task.
        if let Some(previous) = previous {
            tracing::trace!(generation = previous.generation(), "Stopping progress ticker");
        }
    }

    pub(crate) fn cancel_volume_debounce(&self) {
        if let Some(pending) = self
            .volume_debounce
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pending.abort();
        }
    }

    /// Stop every backend, used on exit.
    pub async fn shutdown(&self) {
        self.set_ticker(None);
        self.cancel_volume_debounce();
        let backends = self.backends.lock().await.clone();
        for backend in backends.all() {
            backend.shutdown().await;
        }
        tracing::info!("Backends shut down");
    }

    /// Surface a failure according to its kind.
    pub(crate) async fn report_error(&self, error: PlayerError) {
        match error {
            PlayerError::Unsupported(what) => {
                tracing::debug!(what, "Ignoring unsupported operation");
            }
            PlayerError::Auth(message) => {
                tracing::warn!(error = %message, "Spotify rejected our credentials, signing out");
                self.sign_out(false).await;
                self.model
                    .lock()
                    .await
                    .set_error(Self::format_error(&PlayerError::Auth(message)));
            }
            other => {
                tracing::error!(error = %other, "Operation failed");
                self.model.lock().await.set_error(Self::format_error(&other));
            }
        }
    }

    pub(crate) fn format_error(error: &PlayerError) -> String {
        let error_str = error.to_string();

        match error {
            PlayerError::Auth(_) => "Spotify session expired. Press L to log in again.".to_string(),
            PlayerError::ResolutionFailed(title) => format!("Could not find a way to play \"{title}\"."),
            PlayerError::Backend {
                kind: BackendKind::Spotify,
                message,
            } => {
                if message.contains("404") {
                    "Spotify device not found. Wait for it to connect and try again.".to_string()
                } else if message.contains("403") {
                    "Action forbidden. Check your Spotify Premium status.".to_string()
                } else if message.contains("429") {
                    "Rate limited. Please wait a moment.".to_string()
                } else {
                    format!("Error: {}", error_str)
                }
            }
            _ => format!("Error: {}", error_str),
        }
    }
}
