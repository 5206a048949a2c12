//! Caches for lazily fetched per-track metadata.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;

const RESOLVED_IDS_FILE: &str = "youtube_ids.json";

/// Video ids found by search, keyed by the normalized search query.
///
/// Generated tracks get a fresh id on every search, so the title and artist
/// are what identify a song across searches and runs.
///
/// Lookups cost API quota, so the map is saved next to the other cache files
/// and reloaded on start.
#[derive(Clone)]
pub struct ResolvedIdCache {
    ids: Arc<RwLock<HashMap<String, String>>>,
    path: Option<PathBuf>,
}

impl ResolvedIdCache {
    pub fn in_memory() -> Self {
        Self {
            ids: Arc::new(RwLock::new(HashMap::new())),
            path: None,
        }
    }

    pub fn persistent(cache_dir: &Path) -> Self {
        Self {
            ids: Arc::new(RwLock::new(HashMap::new())),
            path: Some(cache_dir.join(RESOLVED_IDS_FILE)),
        }
    }

    pub async fn load_from_disk(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let ids: HashMap<String, String> = serde_json::from_str(&content)?;
            *self.ids.write().await = ids;
        }
        Ok(())
    }

    pub async fn save_to_disk(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let content = serde_json::to_string(&*self.ids.read().await)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    pub async fn get(&self, query: &str) -> Option<String> {
        self.ids.read().await.get(&Self::key(query)).cloned()
    }

    pub async fn insert(&self, query: &str, video_id: String) {
        self.ids.write().await.insert(Self::key(query), video_id);
    }

    fn key(query: &str) -> String {
        query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
    }
}

/// Lyrics fetched or edited during this run, keyed by track id.
///
/// Tracks are shared between the queue, search results and playlists; keeping
/// lyrics here means one fetch serves every copy.
#[derive(Clone, Debug, Default)]
pub struct LyricsCache {
    entries: HashMap<String, String>,
}

impl LyricsCache {
    pub fn get(&self, track_id: &str) -> Option<&str> {
        self.entries.get(track_id).map(String::as_str)
    }

    pub fn insert(&mut self, track_id: impl Into<String>, lyrics: impl Into<String>) {
        self.entries.insert(track_id.into(), lyrics.into());
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.entries.contains_key(track_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolved_ids_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResolvedIdCache::persistent(dir.path());
        cache.insert("Never Gonna Give You Up Rick Astley", "dQw4w9WgXcQ".into()).await;
        cache.save_to_disk().await.unwrap();

        let reloaded = ResolvedIdCache::persistent(dir.path());
        reloaded.load_from_disk().await.unwrap();
        assert_eq!(
            reloaded.get("Never Gonna Give You Up Rick Astley").await.as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(reloaded.get("Take On Me a-ha").await, None);
    }

    #[tokio::test]
    async fn queries_differing_in_case_and_spacing_share_an_entry() {
        let cache = ResolvedIdCache::in_memory();
        cache.insert("Midnight City  M83", "abc".into()).await;
        assert_eq!(cache.get("midnight city m83").await.as_deref(), Some("abc"));
        assert_eq!(cache.get(" MIDNIGHT CITY M83 ").await.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn in_memory_cache_never_touches_disk() {
        let cache = ResolvedIdCache::in_memory();
        cache.insert("song artist", "abc".into()).await;
        cache.save_to_disk().await.unwrap();
        cache.load_from_disk().await.unwrap();
        assert_eq!(cache.get("song artist").await.as_deref(), Some("abc"));
    }

    #[test]
    fn edited_lyrics_replace_fetched_ones() {
        let mut lyrics = LyricsCache::default();
        lyrics.insert("t1", "first");
        lyrics.insert("t1", "edited");
        assert_eq!(lyrics.get("t1"), Some("edited"));
        assert!(!lyrics.contains("t2"));
    }
}
