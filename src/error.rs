//! Error taxonomy shared by the playback backends and metadata services.
//!
//! Every variant is recoverable: the controller decides per variant whether
//! to log out, show a banner, fall back to a placeholder or ignore it.

use thiserror::Error;

use crate::backend::BackendKind;

#[derive(Debug, Error)]
pub enum PlayerError {
    /// The remote service rejected or expired our credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// No backend could be resolved for the track.
    #[error("no playable source for \"{0}\"")]
    ResolutionFailed(String),

    /// Metadata or search request failed in transit.
    #[error("network error: {0}")]
    Network(String),

    /// The operation is not available right now (e.g. seek before load).
    #[error("{0} is not supported in the current state")]
    Unsupported(&'static str),

    /// Device, process or decoder failure inside a backend.
    #[error("{kind} backend error: {message}")]
    Backend { kind: BackendKind, message: String },
}

impl PlayerError {
    pub fn backend(kind: BackendKind, message: impl Into<String>) -> Self {
        Self::Backend {
            kind,
            message: message.into(),
        }
    }
}

/// Map an rspotify client error onto the taxonomy.
///
/// rspotify folds the HTTP status into its error text, so the status code is
/// matched on the rendered message.
pub fn classify_spotify_error(e: rspotify::ClientError) -> PlayerError {
    let text = e.to_string();
    if text.contains("401") {
        PlayerError::Auth(text)
    } else if ["403", "404", "429"].iter().any(|code| text.contains(code)) {
        PlayerError::backend(BackendKind::Spotify, text)
    } else {
        PlayerError::Network(text)
    }
}

pub type PlayerResult<T> = Result<T, PlayerError>;
