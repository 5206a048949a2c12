//! Spotify sign-in and sign-out

use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::audio::SpotifyDevice;
use crate::backend::{BackendKind, PlaybackBackend, SpotifyBackend};
use crate::model::{AuthStatus, DeviceStatus, SpotifyClient};

use super::AppController;

impl AppController {
    /// Run the OAuth flow, register the Connect device and load the library.
    pub async fn login(&self) {
        {
            let mut model = self.model.lock().await;
            if !matches!(model.auth, AuthStatus::Unauthenticated) {
                return;
            }
            model.auth = AuthStatus::Authenticating;
            model.device = DeviceStatus::Connecting;
        }

        match self.connect_spotify().await {
            Ok(()) => {
                let controller = self.clone();
                tokio::spawn(async move {
                    controller.load_library().await;
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "Spotify login failed");
                let mut model = self.model.lock().await;
                model.auth = AuthStatus::Unauthenticated;
                model.device = DeviceStatus::Disconnected;
                model.set_error(format!("Spotify login failed: {e}"));
            }
        }
    }

    async fn connect_spotify(&self) -> Result<()> {
        let settings = &self.settings.spotify;
        if !settings.enabled {
            return Err(anyhow!("Spotify is disabled in the configuration"));
        }

        let auth = crate::auth::perform_oauth_flow(settings).await?;
        let client = SpotifyClient::connect(
            settings.clone(),
            auth.rspotify_token.clone(),
            auth.refresh_token.clone(),
        )
        .await?;
        let (user_id, display_name) = client.current_user().await?;

        let device = SpotifyDevice::connect(&auth, settings).await?;
        let device_id = device.device_id().to_string();
        let backend = Arc::new(SpotifyBackend::new(client.clone(), device, self.events.clone()));

        self.install_spotify(backend, Some(client), user_id, device_id)
            .await;
        tracing::info!(user = %display_name, "Signed in to Spotify");
        Ok(())
    }

    /// Make Spotify routable: the backend joins the set and the account is
    /// marked ready.
    pub(crate) async fn install_spotify(
        &self,
        backend: Arc<dyn PlaybackBackend>,
        client: Option<SpotifyClient>,
        user_id: String,
        device_id: String,
    ) {
        self.backends.lock().await.spotify = Some(backend);
        let mut model = self.model.lock().await;
        model.spotify = client;
        model.auth = AuthStatus::Authenticated { user_id };
        model.device = DeviceStatus::Ready { device_id };
    }

    /// User-requested logout: also drops the stored refresh token.
    pub async fn logout(&self) {
        self.sign_out(true).await;
        tracing::info!("Logged out of Spotify");
    }

    /// Forget the account and detach the Spotify backend. Local playback and
    /// YouTube keep working; no Web API request is made from here on.
    pub(crate) async fn sign_out(&self, forget_refresh_token: bool) {
        // A switch in flight completes before Spotify is detached.
        let _switch = self.switch_lock.lock().await;
        let spotify = self.backends.lock().await.spotify.take();
        let was_active = {
            let mut model = self.model.lock().await;
            let was_active = model.session.backend() == Some(BackendKind::Spotify);
            if was_active {
                model.session.release();
            }
            model.logout();
            was_active
        };
        if was_active {
            self.set_ticker(None);
            self.cancel_volume_debounce();
        }
        if let Some(backend) = spotify {
            backend.shutdown().await;
        }
        if forget_refresh_token {
            crate::auth::forget_refresh_token(&self.settings.spotify).await;
        }
    }

    /// Refresh the Web API token when it is close to expiry.
    pub async fn refresh_token_if_needed(&self) {
        let Some(client) = self.model.lock().await.get_spotify_client() else {
            return;
        };
        if let Err(e) = client.refresh_token_if_needed().await {
            self.report_error(e).await;
        }
    }
}
