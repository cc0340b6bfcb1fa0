use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::repair::{repair, ExtractionError};

/// Failure of a structured generation call. Never escapes as a panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("generation service is not configured")]
    NotConfigured,
    #[error("generation call failed: {detail}")]
    CallFailed { detail: String },
    #[error("generator returned an empty response")]
    Empty,
    #[error("generator returned invalid json")]
    InvalidJson { raw: String },
    #[error("generator returned an unexpected shape: {detail}")]
    UnexpectedShape { detail: String },
}

impl From<ExtractionError> for GenerationError {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::EmptyResponse => Self::Empty,
            ExtractionError::InvalidJson { raw } => Self::InvalidJson { raw },
        }
    }
}

/// Wire form of a [`GenerationError`], reported to clients as data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "_error")]
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl GenerationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotConfigured => "gemini_not_configured",
            Self::CallFailed { .. } => "gemini_call_failed",
            Self::Empty => "empty_response",
            Self::InvalidJson { .. } => "invalid_json",
            Self::UnexpectedShape { .. } => "unexpected_shape",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let (detail, raw) = match self {
            Self::NotConfigured => (Some("GEMINI_API_KEY not found in environment variables".to_string()), None),
            Self::CallFailed { detail } | Self::UnexpectedShape { detail } => (Some(detail.clone()), None),
            Self::Empty => (None, None),
            Self::InvalidJson { raw } => (None, Some(raw.clone())),
        };
        ErrorBody {
            code: self.code(),
            detail,
            raw,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

/// The response shapes a text generator is known to produce.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GeneratorResponse {
    Direct {
        text: String,
        #[serde(default)]
        candidates: Vec<Candidate>,
    },
    Nested { candidates: Vec<Candidate> },
}

impl GeneratorResponse {
    #[cfg(test)]
    pub fn direct(text: impl Into<String>) -> Self {
        Self::Direct {
            text: text.into(),
            candidates: Vec::new(),
        }
    }

    /// First non-empty text, in provider order; empty if there is none.
    ///
    /// A blank top-level `text` falls through to the candidates.
    pub fn text(&self) -> String {
        match self {
            Self::Direct { text, .. } if !text.trim().is_empty() => text.clone(),
            Self::Direct { candidates, .. } | Self::Nested { candidates } => {
                first_candidate_text(candidates).to_string()
            }
        }
    }
}

fn first_candidate_text(candidates: &[Candidate]) -> &str {
    candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.text.as_deref())
        .find(|t| !t.trim().is_empty())
        .unwrap_or_default()
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GeneratorResponse, GenerationError>;
}

/// Runs prompts through the configured generator and repairs the output into JSON.
#[derive(Clone, Default)]
pub struct GenerationClient {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl GenerationClient {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    pub fn disabled() -> Self {
        Self { generator: None }
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    #[instrument(skip_all, fields(prompt_len = prompt.len()))]
    pub async fn generate_structured(&self, prompt: &str) -> Result<Value, GenerationError> {
        let Some(generator) = &self.generator else {
            return Err(GenerationError::NotConfigured);
        };
        let response = generator.generate(prompt).await?;
        let text = response.text();
        debug!(text_len = text.len(), "generator responded");
        repair(&text).map_err(|e| {
            warn!(code = e.code(), error = %e, "generator output could not be repaired");
            GenerationError::from(e)
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Replays canned responses in order and counts calls.
    #[derive(Default)]
    pub struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<GeneratorResponse, GenerationError>>>,
        pub calls: AtomicUsize,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub fn replying(texts: &[&str]) -> Arc<Self> {
            let replies = texts
                .iter()
                .map(|t| Ok(GeneratorResponse::direct(*t)))
                .collect();
            Arc::new(Self {
                replies: Mutex::new(replies),
                ..Default::default()
            })
        }

        pub fn failing(detail: &str) -> Arc<Self> {
            let replies = VecDeque::from([Err(GenerationError::CallFailed {
                detail: detail.to_string(),
            })]);
            Arc::new(Self {
                replies: Mutex::new(replies),
                ..Default::default()
            })
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<GeneratorResponse, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(GeneratorResponse::direct("")))
        }
    }
}
