//! Wire types for the OpenAI-compatible chat-completions API, plus the
//! upstream error taxonomy.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Build a `system` turn.
///
/// Client turns are never rebuilt this way: they travel upstream as the raw
/// JSON objects the widget sent, extra keys and multimodal content included.
pub fn system_message(text: impl Into<String>) -> Value {
    json!({ "role": "system", "content": text.into() })
}

/// Body posted to the completions endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Value],
    pub temperature: &'a Value,
    pub stream: bool,
}

/// The subset of the completions response we read.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// A successful assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub reply: String,
    pub usage: Option<Value>,
}

impl CompletionResponse {
    /// Pull the first choice's text, rejecting empty answers.
    pub fn into_completion(self) -> Result<Completion, UpstreamError> {
        let first = self.choices.into_iter().next().ok_or(UpstreamError::NoChoices)?;
        let reply = first
            .message
            .and_then(|m| m.content)
            .filter(|c| !c.is_empty())
            .ok_or(UpstreamError::MissingContent)?;
        Ok(Completion {
            reply,
            usage: self.usage,
        })
    }
}

/// Errors that can occur while relaying a chat turn.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// No credential configured.
    #[error("Server misconfigured: missing GROQ_API_KEY environment variable")]
    MissingApiKey,

    /// Upstream answered 429.
    #[error("upstream rate limit reached")]
    RateLimited { retry_after: Option<String> },

    /// Upstream answered with a non-success status.
    #[error("upstream returned {status}")]
    Status { status: StatusCode, details: Value },

    /// No response was received (connect failure, timeout, bad body).
    #[error("upstream request failed: {0}")]
    Transport(String),

    /// Response carried an empty `choices` array.
    #[error("Groq API returned no choices")]
    NoChoices,

    /// First choice had no message text.
    #[error("Groq API response missing message content")]
    MissingContent,
}

impl UpstreamError {
    /// HTTP status the gateway answers with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            UpstreamError::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
            UpstreamError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            UpstreamError::Status { status, .. } => *status,
            UpstreamError::Transport(_)
            | UpstreamError::NoChoices
            | UpstreamError::MissingContent => StatusCode::BAD_GATEWAY,
        }
    }

    /// Upstream status, when one was received.
    pub fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            UpstreamError::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
