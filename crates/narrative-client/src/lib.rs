pub mod error;
pub mod gemini;
pub mod prompts;
pub mod provider;

pub use error::{NarrativeError, NarrativeResult};
pub use gemini::GeminiClient;
pub use prompts::{fallback_suggestions, Suggestion, SUGGESTION_CONTEXT_LIMIT};
pub use provider::NarrativeProvider;

use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite-preview-09-2025";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration for the text-generation service
#[derive(Debug, Clone)]
pub struct NarrativeConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl NarrativeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
