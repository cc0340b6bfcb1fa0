use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Why raw generator text could not be turned into JSON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("generator returned an empty response")]
    EmptyResponse,
    #[error("generator returned invalid json")]
    InvalidJson { raw: String },
}

impl ExtractionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyResponse => "empty_response",
            Self::InvalidJson { .. } => "invalid_json",
        }
    }
}

/// Removes one enclosing code fence (```` ```json ```` ... ```` ``` ````), keeping the inner text.
pub fn strip_code_fences(raw: &str) -> &str {
    lazy_static! {
        static ref OPENING_FENCE: Regex = Regex::new(r"^```[^\n]*(\n|$)").unwrap();
        static ref CLOSING_FENCE: Regex = Regex::new(r"(^|\n)[ \t]*```[ \t]*$").unwrap();
    }
    let trimmed = raw.trim();
    let Some(open) = OPENING_FENCE.find(trimmed) else {
        return trimmed;
    };
    let inner = &trimmed[open.end()..];
    let inner = match CLOSING_FENCE.find(inner) {
        Some(close) => &inner[..close.start()],
        None => inner,
    };
    inner.trim()
}

/// Turns untrusted generator text into a JSON value.
pub fn repair(raw: &str) -> Result<Value, ExtractionError> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }
    serde_json::from_str(text).map_err(|_| ExtractionError::InvalidJson {
        raw: text.to_string(),
    })
}
