//! Error responses.
//!
//! Every failure leaves the gateway as JSON: `{"error": "..."}`, plus
//! `"details"` when the upstream said something worth passing on.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::registration::{FlowError, SessionError};
use crate::upstream::UpstreamError;

/// Error type returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    PayloadTooLarge(String),
    TooManyRequests(String),
    Unavailable(String),
    Upstream(UpstreamError),
}

impl ApiError {
    fn parts(self) -> (StatusCode, String, Option<Value>) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg, None),
            ApiError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg, None),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg, None),
            ApiError::Upstream(err) => {
                let status = err.status_code();
                match err {
                    UpstreamError::RateLimited { retry_after } => {
                        let mut msg = "Groq rate limit reached. Please wait a few seconds before trying again."
                            .to_string();
                        if let Some(wait) = retry_after {
                            msg.push_str(&format!(" Suggested wait: {} seconds.", wait));
                        }
                        (status, msg, None)
                    }
                    UpstreamError::Status { details, .. } => {
                        (status, "Groq API request failed".to_string(), Some(details))
                    }
                    UpstreamError::Transport(detail) => (
                        status,
                        "Groq API request failed".to_string(),
                        Some(Value::String(detail)),
                    ),
                    other => (status, other.to_string(), None),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = self.parts();
        let body = match details {
            Some(details) => json!({ "error": error, "details": details }),
            None => json!({ "error": error }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        ApiError::Upstream(err)
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound => ApiError::NotFound(err.to_string()),
            SessionError::Full => ApiError::Unavailable(err.to_string()),
            SessionError::Flow(FlowError::EmptyMessage) => ApiError::BadRequest(err.to_string()),
            SessionError::Flow(_) => ApiError::Conflict(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn rate_limit_mentions_retry_after() {
        let (status, body) = render(ApiError::Upstream(UpstreamError::RateLimited {
            retry_after: Some("7".into()),
        }))
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            body["error"],
            "Groq rate limit reached. Please wait a few seconds before trying again. Suggested wait: 7 seconds."
        );
    }

    #[tokio::test]
    async fn upstream_status_passes_details_through() {
        let (status, body) = render(ApiError::Upstream(UpstreamError::Status {
            status: StatusCode::UNAUTHORIZED,
            details: json!({"error": {"message": "Invalid API Key"}}),
        }))
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Groq API request failed");
        assert_eq!(body["details"]["error"]["message"], "Invalid API Key");
    }

    #[tokio::test]
    async fn missing_key_is_server_error_without_details() {
        let (status, body) = render(ApiError::Upstream(UpstreamError::MissingApiKey)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"error": "Server misconfigured: missing GROQ_API_KEY environment variable"})
        );
    }

    #[tokio::test]
    async fn session_errors_map_to_statuses() {
        let (status, _) = render(SessionError::NotFound.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = render(SessionError::Flow(FlowError::AlreadySubmitted).into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = render(SessionError::Flow(FlowError::EmptyMessage).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = render(SessionError::Full.into()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
