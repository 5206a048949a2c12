//! Spotify authorization: browser OAuth for librespot plus the Web API token.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use librespot::core::{authentication::Credentials, cache::Cache};
use rspotify::Token;

use crate::config::SpotifySettings;

pub const SCOPES: &str = "streaming user-read-email user-read-private user-read-playback-state user-modify-playback-state user-read-currently-playing playlist-read-private playlist-read-collaborative user-top-read";

const RESPONSE: &str = r#"
<!doctype html>
<html>
<head><title>StreamAI</title></head>
<body><h1>Connected to Spotify</h1><p>You can close this window.</p><script>window.close();</script></body>
</html>
"#;
const REFRESH_TOKEN_FILE: &str = "refresh_token";
const TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Clone)]
pub struct AuthResult {
    pub librespot_credentials: Credentials,
    pub rspotify_token: Token,
    pub refresh_token: String,
    pub cache: Cache,
}

fn scopes() -> Vec<&'static str> {
    SCOPES.split_whitespace().collect()
}

fn refresh_token_path(settings: &SpotifySettings) -> PathBuf {
    settings.cache_dir.join(REFRESH_TOKEN_FILE)
}

fn oauth_client(
    settings: &SpotifySettings,
    interactive: bool,
) -> Result<librespot_oauth::OAuthClient> {
    if settings.client_id.is_empty() {
        return Err(anyhow!(
            "Spotify client id is not configured (set spotify.client_id or SPOTIFY_CLIENT_ID)"
        ));
    }
    let mut builder =
        librespot_oauth::OAuthClientBuilder::new(&settings.client_id, &settings.redirect_uri, scopes());
    if interactive {
        builder = builder.open_in_browser().with_custom_message(RESPONSE);
    }
    builder.build().context("Failed to build OAuth client")
}

pub fn rspotify_token(access_token: String, expires_at: DateTime<Utc>) -> Token {
    Token {
        access_token,
        expires_in: chrono::Duration::seconds(TOKEN_LIFETIME_SECS),
        expires_at: Some(expires_at),
        scopes: SCOPES
            .split_whitespace()
            .map(|s| s.to_string())
            .collect::<HashSet<String>>(),
        refresh_token: None,
    }
}

async fn perform_browser_auth(settings: &SpotifySettings) -> Result<(Credentials, String, String)> {
    tracing::info!("Starting browser-based OAuth flow");
    let client = oauth_client(settings, true)?;
    let token = client
        .get_access_token_async()
        .await
        .context("Spotify authorization was not completed")?;

    if let Err(e) = tokio::fs::write(refresh_token_path(settings), &token.refresh_token).await {
        tracing::warn!(error = %e, "Could not persist refresh token");
    } else {
        tracing::debug!("Saved refresh token to disk");
    }

    let credentials = Credentials::with_access_token(token.access_token.clone());
    tracing::info!("Browser authentication completed successfully");
    Ok((credentials, token.access_token, token.refresh_token))
}

/// Authorize with cached credentials when possible, otherwise in the browser.
pub async fn perform_oauth_flow(settings: &SpotifySettings) -> Result<AuthResult> {
    let cache_dir = settings.cache_dir.clone();
    let files_dir = cache_dir.join("files");
    tokio::fs::create_dir_all(&cache_dir).await?;
    let cache = Cache::new(Some(&cache_dir), Some(&cache_dir), Some(&files_dir), None)?;

    let stored_refresh_token = tokio::fs::read_to_string(refresh_token_path(settings))
        .await
        .ok()
        .filter(|t| !t.trim().is_empty());

    let (credentials, access_token, refresh_token) =
        if let (Some(creds), Some(refresh_token)) = (cache.credentials(), stored_refresh_token) {
            tracing::info!("Found cached Librespot credentials and refresh token");
            match refresh_access_token(settings, refresh_token.trim()).await {
                Ok((access_token, new_refresh_token, _)) => (creds, access_token, new_refresh_token),
                Err(e) => {
                    tracing::warn!(error = %e, "Cached refresh token failed, re-authenticating");
                    perform_browser_auth(settings).await?
                }
            }
        } else {
            tracing::info!("No cached credentials found, starting browser authentication");
            perform_browser_auth(settings).await?
        };

    let expires_at = Utc::now() + chrono::Duration::seconds(TOKEN_LIFETIME_SECS);
    Ok(AuthResult {
        librespot_credentials: credentials,
        rspotify_token: rspotify_token(access_token, expires_at),
        refresh_token,
        cache,
    })
}

/// Exchange a refresh token for a new access token.
///
/// Returns the access token, the (possibly rotated) refresh token and its expiry.
pub async fn refresh_access_token(
    settings: &SpotifySettings,
    refresh_token: &str,
) -> Result<(String, String, DateTime<Utc>)> {
    let client = oauth_client(settings, false)?;
    let token = client
        .refresh_token_async(refresh_token)
        .await
        .context("Token refresh rejected")?;

    if let Err(e) = tokio::fs::write(refresh_token_path(settings), &token.refresh_token).await {
        tracing::warn!(error = %e, "Could not persist refreshed token");
    }
    tracing::debug!("Token refreshed successfully");

    let expires_at = Utc::now() + chrono::Duration::seconds(TOKEN_LIFETIME_SECS);
    Ok((token.access_token, token.refresh_token, expires_at))
}

/// Drop the stored refresh token so the next login goes through the browser.
pub async fn forget_refresh_token(settings: &SpotifySettings) {
    match tokio::fs::remove_file(refresh_token_path(settings)).await {
        Ok(()) => tracing::debug!("Removed stored refresh token"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(error = %e, "Could not remove refresh token"),
    }
}
