//! Remote metadata services: the LLM collaborator and YouTube id lookup.
//!
//! Failures here never stop playback; callers fall back to the placeholder
//! constants below.

pub mod llm;
pub mod youtube_search;

pub use llm::GeminiClient;
pub use youtube_search::{VideoResolver, YouTubeSearch};

pub const DEFAULT_GREETING: &str = "Welcome Back";
pub const LYRICS_UNAVAILABLE: &str = "Lyrics not available.";
pub const LYRICS_FAILED: &str = "Could not load lyrics. Please try again.";
