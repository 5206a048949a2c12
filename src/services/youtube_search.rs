//! Video id lookup through the YouTube Data API v3.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::YouTubeSettings;
use crate::error::{PlayerError, PlayerResult};

const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/search";

/// Finds a playable video for a free-text query.
#[async_trait]
pub trait VideoResolver: Send + Sync {
    /// `Ok(None)` when the search ran but found nothing.
    async fn resolve(&self, query: &str) -> PlayerResult<Option<String>>;
}

pub struct YouTubeSearch {
    http: reqwest::Client,
    api_key: String,
}

impl YouTubeSearch {
    pub fn new(http: reqwest::Client, settings: &YouTubeSettings) -> Self {
        Self {
            http,
            api_key: settings.api_key.clone(),
        }
    }
}

#[async_trait]
impl VideoResolver for YouTubeSearch {
    async fn resolve(&self, query: &str) -> PlayerResult<Option<String>> {
        if self.api_key.is_empty() {
            return Err(PlayerError::Network("YouTube API key not configured".to_string()));
        }
        tracing::debug!(query, "YouTube search started");
        let body: Value = self
            .http
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("maxResults", "1"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| PlayerError::Network(e.to_string()))?
            .json()
            .await
            .map_err(|e| PlayerError::Network(e.to_string()))?;

        let video_id = first_video_id(&body);
        tracing::info!(query, video_id = ?video_id, "YouTube search finished");
        Ok(video_id)
    }
}

/// `items[0].id.videoId` of a search response.
pub fn first_video_id(body: &Value) -> Option<String> {
    body.get("items")?
        .as_array()?
        .iter()
        .find_map(|item| item.pointer("/id/videoId")?.as_str())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn picks_first_video_id() {
        let body = json!({
            "items": [
                { "id": { "kind": "youtube#video", "videoId": "abc123" } },
                { "id": { "kind": "youtube#video", "videoId": "later" } }
            ]
        });
        assert_eq!(first_video_id(&body).as_deref(), Some("abc123"));
    }

    #[test]
    fn empty_or_odd_responses_have_no_id() {
        assert_eq!(first_video_id(&json!({ "items": [] })), None);
        assert_eq!(first_video_id(&json!({ "error": { "code": 403 } })), None);
        assert_eq!(first_video_id(&json!({ "items": [{ "id": { "channelId": "c" } }] })), None);
    }

    #[tokio::test]
    async fn missing_key_is_a_network_error() {
        let search = YouTubeSearch::new(reqwest::Client::new(), &YouTubeSettings::default());
        assert!(matches!(search.resolve("q").await, Err(PlayerError::Network(_))));
    }
}
