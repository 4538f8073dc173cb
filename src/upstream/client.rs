//! HTTP client for the hosted LLM.

use std::time::Duration;

use axum::http::StatusCode;
use reqwest::header::RETRY_AFTER;
use serde_json::Value;

use crate::config::{RetryConfig, TimeoutConfig, UpstreamConfig};
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::retries::{is_retryable, RetryPolicy};
use crate::upstream::types::{Completion, CompletionRequest, CompletionResponse, UpstreamError};

/// Relays assembled conversations to the chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(
        upstream: &UpstreamConfig,
        timeouts: &TimeoutConfig,
        retries: &RetryConfig,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.upstream_secs))
            .build()?;

        Ok(Self {
            http,
            api_url: upstream.api_url.clone(),
            api_key: upstream.api_key.clone(),
            retry: RetryPolicy::from_config(retries),
        })
    }

    /// Whether a credential is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send one non-streaming completion request.
    pub async fn complete(
        &self,
        messages: &[Value],
        model: &str,
        temperature: &Value,
    ) -> Result<Completion, UpstreamError> {
        let api_key = self.api_key.as_deref().ok_or(UpstreamError::MissingApiKey)?;
        let body = CompletionRequest {
            model,
            messages,
            temperature,
            stream: false,
        };

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.send_once(api_key, &body).await {
                Ok(completion) => return Ok(completion),
                Err(err) => {
                    let retryable = matches!(err, UpstreamError::Transport(_) | UpstreamError::Status { .. })
                        && is_retryable(err.upstream_status());
                    if retryable && self.retry.allows_another(attempts) {
                        let delay = calculate_backoff(
                            attempts,
                            self.retry.base_delay_ms,
                            self.retry.max_delay_ms,
                        );
                        tracing::info!(attempt = attempts, delay = ?delay, error = %err, "Retrying upstream request");
                        metrics::record_upstream_retry();
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    async fn send_once(
        &self,
        api_key: &str,
        body: &CompletionRequest<'_>,
    ) -> Result<Completion, UpstreamError> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Upstream transport error");
                UpstreamError::Transport(e.to_string())
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            tracing::warn!(retry_after = ?retry_after, "Upstream rate limit reached");
            return Err(UpstreamError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let details = if text.trim().is_empty() {
                Value::String(format!("upstream returned {}", status))
            } else {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            };
            tracing::warn!(status = %status, "Upstream request rejected");
            return Err(UpstreamError::Status { status, details });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Transport(format!("invalid upstream response: {}", e)))?;
        parsed.into_completion()
    }
}
