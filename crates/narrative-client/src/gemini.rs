use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{NarrativeError, NarrativeResult};
use crate::provider::NarrativeProvider;
use crate::NarrativeConfig;

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn into_text(self) -> NarrativeResult<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(NarrativeError::InvalidResponse(
                "response contained no text".to_string(),
            ));
        }
        Ok(text)
    }
}

/// Google Gemini `generateContent` client
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    config: NarrativeConfig,
}

impl GeminiClient {
    pub fn new(config: NarrativeConfig) -> NarrativeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl NarrativeProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> NarrativeResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NarrativeError::Timeout
                } else {
                    NarrativeError::RequestFailed(e)
                }
            })?;

        if !response.status().is_success() {
            tracing::warn!("Gemini request failed with status {}", response.status());
            return Err(NarrativeError::ServiceUnavailable(format!(
                "Status: {}",
                response.status()
            )));
        }

        let body = response.json::<GenerateResponse>().await?;
        body.into_text()
    }

    fn backend_name(&self) -> &'static str {
        "gemini"
    }
}
