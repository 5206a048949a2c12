use crate::auth::AuthResult;
use crate::config::SpotifySettings;
use anyhow::{anyhow, Result};
use librespot::connect::{ConnectConfig, Spirc};
use librespot::core::config::SessionConfig;
use librespot::core::session::Session;
use librespot::playback::config::{AudioFormat, Bitrate, PlayerConfig};
use librespot::playback::mixer::MixerConfig;
use librespot::playback::player::{Player, PlayerEventChannel};
use librespot::playback::{audio_backend, mixer};
use std::sync::Arc;

/// The local Spotify Connect device playback is routed to.
pub struct SpotifyDevice {
    player: Arc<Player>,
    session: Session,
    spirc: Spirc,
    device_id: String,
}

impl SpotifyDevice {
    pub async fn connect(auth: &AuthResult, settings: &SpotifySettings) -> Result<Self> {
        let device_id = Self::device_id_for(&settings.device_name);
        tracing::info!(device = %settings.device_name, device_id = %device_id, "Connecting librespot");

        let session_config = SessionConfig {
            device_id: device_id.clone(),
            ..Default::default()
        };

        let player_config = PlayerConfig {
            bitrate: Bitrate::Bitrate320,
            ..Default::default()
        };
        let audio_format = AudioFormat::default();
        let connect_config = ConnectConfig {
            name: settings.device_name.clone(),
            ..Default::default()
        };
        let mixer_config = MixerConfig::default();
        let sink_builder =
            audio_backend::find(None).ok_or_else(|| anyhow!("No librespot audio backend available"))?;
        let mixer_builder = mixer::find(None).ok_or_else(|| anyhow!("No librespot mixer available"))?;

        let session = Session::new(session_config, Some(auth.cache.clone()));

        let mixer = mixer_builder(mixer_config)?;

        let player = Player::new(
            player_config,
            session.clone(),
            mixer.get_soft_volume(),
            move || sink_builder(None, audio_format),
        );

        let (spirc, spirc_task) = Spirc::new(
            connect_config,
            session.clone(),
            auth.librespot_credentials.clone(),
            player.clone(),
            mixer,
        )
        .await?;

        spirc.activate()?;

        tokio::spawn(async move {
            let _spirc_task_res = spirc_task.await;
            tracing::debug!("Spirc task finished");
        });

        tracing::info!(user = %session.username(), "Spotify device ready");

        Ok(Self {
            player,
            session,
            spirc,
            device_id,
        })
    }

    /// Stable per machine so the Web API keeps addressing the same device.
    fn device_id_for(device_name: &str) -> String {
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        format!("{}-{}", device_name, hostname)
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn event_channel(&self) -> PlayerEventChannel {
        self.player.get_player_event_channel()
    }

    /// Silence the device without telling the Web API.
    pub fn stop(&self) {
        self.player.stop();
    }

    pub fn shutdown(&self) {
        self.player.stop();
        if let Err(e) = self.spirc.shutdown() {
            tracing::warn!(error = %e, "Spirc shutdown failed");
        }
        self.session.shutdown();
    }
}
