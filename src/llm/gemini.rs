use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, instrument};

use super::client::{GenerationError, GeneratorResponse, TextGenerator};
use crate::config::GeminiConfig;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

/// Google Gemini `generateContent` over REST.
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGenerator {
    /// Returns `None` when no API key is configured.
    pub fn from_config(cfg: &GeminiConfig) -> anyhow::Result<Option<Self>> {
        let Some(api_key) = cfg.api_key.clone() else {
            return Ok(None);
        };
        let client = Client::builder().timeout(cfg.timeout()).build()?;
        Ok(Some(Self {
            client,
            api_key,
            model: cfg.model.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        }))
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, prompt: &str) -> Result<GeneratorResponse, GenerationError> {
        let body = GenerateRequest {
            contents: [RequestContent {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
        };
        let call_failed = |detail: String| GenerationError::CallFailed { detail };

        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "gemini request failed");
                call_failed(format!("HTTP request failed: {e}"))
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| call_failed(format!("Failed to read response: {e}")))?;
        if !status.is_success() {
            error!(%status, "gemini api error");
            return Err(call_failed(format!("Gemini API returned {status}: {text}")));
        }
        debug!(bytes = text.len(), "gemini response received");

        serde_json::from_str(&text)
            .map_err(|e| call_failed(format!("Failed to parse Gemini response: {e}")))
    }
}
