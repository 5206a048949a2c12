use std::{env, path::PathBuf};

use super::schema::Settings;

impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("STREAMAI")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let mut settings: Settings = cfg.try_deserialize()?;
        settings.apply_key_fallbacks();
        Ok(settings)
    }

    /// Fill empty credentials from the conventional variables
    /// (`SPOTIFY_CLIENT_ID`, `GEMINI_API_KEY`, `API_KEY`).
    ///
    /// The YouTube key defaults to the LLM key: both are Google API keys.
    pub fn apply_key_fallbacks(&mut self) {
        if self.spotify.client_id.is_empty() {
            if let Ok(id) = env::var("SPOTIFY_CLIENT_ID") {
                self.spotify.client_id = id;
            }
        }
        if self.llm.api_key.is_empty() {
            if let Some(key) = ["GEMINI_API_KEY", "API_KEY"]
                .iter()
                .find_map(|name| env::var(name).ok().filter(|v| !v.is_empty()))
            {
                self.llm.api_key = key;
            }
        }
        if self.youtube.api_key.is_empty() {
            self.youtube.api_key = self.llm.api_key.clone();
        }
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.playback.tick_interval_ms == 0 {
            return Err("playback.tick_interval_ms must be >= 1".to_string());
        }
        if self.playback.initial_volume > 100 {
            return Err("playback.initial_volume must be <= 100".to_string());
        }
        if self.llm.search_count == 0 {
            return Err("llm.search_count must be >= 1".to_string());
        }
        Ok(())
    }
}

/// Resolve the config path from `STREAMAI_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("STREAMAI_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// `$XDG_CONFIG_HOME/streamai/config.toml`, or `~/.config/streamai/config.toml`
/// when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("streamai").join("config.toml"))
}
