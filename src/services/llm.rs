//! Gemini `generateContent` client for search, lyrics and the greeting.

use std::sync::Arc;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::LlmSettings;
use crate::error::{PlayerError, PlayerResult};
use crate::model::{parse_duration, SharedTrack, SourceHandle, Track};

use super::{DEFAULT_GREETING, LYRICS_FAILED, LYRICS_UNAVAILABLE};

const COVER_ENDPOINT: &str = "https://image.pollinations.ai/prompt/";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// One song as the model describes it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestedSong {
    title: String,
    artist: String,
    #[serde(default)]
    album: String,
    #[serde(default)]
    cover_description: String,
    #[serde(default)]
    duration: String,
}

fn song_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "artist": { "type": "STRING" },
                "album": { "type": "STRING" },
                "coverDescription": { "type": "STRING" },
                "duration": { "type": "STRING" }
            },
            "required": ["title", "artist", "album", "coverDescription", "duration"]
        }
    })
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    settings: Arc<LlmSettings>,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, settings: LlmSettings) -> Self {
        Self {
            http,
            settings: Arc::new(settings),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.settings.api_key.is_empty()
    }

    async fn generate(&self, prompt: String, generation_config: Option<GenerationConfig>) -> PlayerResult<String> {
        if !self.is_configured() {
            return Err(PlayerError::Network("LLM API key not configured".to_string()));
        }

        let url = format!(
            "{}/models/{}:generateContent",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.model
        );
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config,
        };

        tracing::debug!(model = %self.settings.model, "LLM request started");
        let response = self
            .http
            .post(url)
            .query(&[("key", self.settings.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| PlayerError::Network(e.to_string()))?
            .json::<GenerateResponse>()
            .await
            .map_err(|e| PlayerError::Network(e.to_string()))?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        Ok(text)
    }

    /// Ask for songs matching a query or mood.
    pub async fn search_tracks(&self, query: &str) -> PlayerResult<Vec<SharedTrack>> {
        let prompt = format!(
            "Generate a list of {count} real songs that match this search query or mood: \"{query}\".\n\
             Return a JSON array.\n\
             For 'duration', ensure it is in \"MM:SS\" format (e.g., \"3:45\").\n\
             For 'coverDescription', provide a concise, creative visual description of the album art \
             (e.g. \"abstract geometric neon shapes\", \"band photo in alleyway black and white\").",
            count = self.settings.search_count,
        );
        let config = GenerationConfig {
            response_mime_type: "application/json",
            response_schema: song_schema(),
        };
        let text = self.generate(prompt, Some(config)).await?;
        let id_prefix = format!("gemini-{}", chrono::Utc::now().timestamp_millis());
        let tracks = parse_search_payload(&text, &id_prefix, self.settings.fallback_audio_url.as_deref())
            .into_iter()
            .take(self.settings.search_count)
            .map(Arc::new)
            .collect::<Vec<_>>();
        tracing::info!(query, results = tracks.len(), "LLM search finished");
        Ok(tracks)
    }

    /// Lyrics text; placeholders on empty answers or failure.
    pub async fn lyrics(&self, title: &str, artist: &str) -> String {
        let prompt = format!(
            "Return the lyrics for the song \"{title}\" by \"{artist}\".\n\
             Return ONLY the lyrics as plain text with standard line breaks.\n\
             Do not include the title or artist in the response headers.\n\
             Do not include \"Lyrics:\" or any intro/outro text.\n\
             If it is an instrumental song, return \"[Instrumental]\".\n\
             If you cannot find the exact lyrics, generate plausible lyrics that fit the song's theme and style."
        );
        match self.generate(prompt, None).await {
            Ok(text) if text.trim().is_empty() => LYRICS_UNAVAILABLE.to_string(),
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, title, "Lyrics request failed");
                LYRICS_FAILED.to_string()
            }
        }
    }

    pub async fn greeting(&self) -> String {
        let prompt = "Give me a short, cool, 3-word greeting for a music app user based on the current time of day. No quotes.".to_string();
        match self.generate(prompt, None).await {
            Ok(text) => normalize_greeting(&text),
            Err(e) => {
                tracing::debug!(error = %e, "Greeting request failed");
                DEFAULT_GREETING.to_string()
            }
        }
    }
}

fn normalize_greeting(text: &str) -> String {
    let greeting = text.trim().trim_matches('"').trim();
    if greeting.is_empty() {
        DEFAULT_GREETING.to_string()
    } else {
        greeting.lines().next().unwrap_or(DEFAULT_GREETING).to_string()
    }
}

/// Cut the JSON array out of a reply that may be wrapped in a code fence or prose.
fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

/// Turn the model's song list into tracks, skipping entries that are not
/// usable songs. Never fails: garbage in yields an empty list.
pub fn parse_search_payload(text: &str, id_prefix: &str, fallback_audio_url: Option<&str>) -> Vec<Track> {
    let Some(json) = extract_json_array(text) else {
        tracing::warn!("LLM search reply contained no JSON array");
        return Vec::new();
    };
    let Ok(entries) = serde_json::from_str::<Vec<Value>>(json) else {
        tracing::warn!("LLM search reply was not valid JSON");
        return Vec::new();
    };

    entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<SuggestedSong>(entry).ok())
        .filter(|song| !song.title.trim().is_empty() && !song.artist.trim().is_empty())
        .enumerate()
        .map(|(i, song)| {
            let cover = cover_url(&song.cover_description, &song.album);
            let track = Track::new(
                format!("{id_prefix}-{i}"),
                song.title.trim(),
                song.artist.trim(),
                song.album.trim(),
                parse_duration(&song.duration),
            )
            .with_cover(cover);
            match fallback_audio_url {
                Some(url) => track.with_source(SourceHandle::Audio(url.to_string())),
                None => track,
            }
        })
        .collect()
}

/// Generated album art for a described cover.
pub fn cover_url(description: &str, album: &str) -> String {
    let prompt = format!("{description} {album} album cover, high quality, 4k");
    let Ok(mut url) = Url::parse(COVER_ENDPOINT) else {
        return String::new();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(prompt.trim());
    }
    url.query_pairs_mut()
        .append_pair("width", "512")
        .append_pair("height", "512")
        .append_pair("nologo", "true");
    url.to_string()
}
