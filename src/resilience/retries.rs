//! Retry classification for upstream LLM calls.
//!
//! # Design Decisions
//! - Connection failures and gateway-class statuses are retryable
//! - 429 is never retried; the caller is told to wait instead
//! - Client errors (4xx) are never retried

use axum::http::StatusCode;

use crate::config::RetryConfig;

/// Whether an upstream outcome is worth another attempt.
///
/// `status` is `None` when no response was received at all.
pub fn is_retryable(status: Option<StatusCode>) -> bool {
    match status {
        None => true,
        Some(s) => matches!(
            s,
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
        ),
    }
}

/// Attempt budget for one chat turn.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Build from config; disabled retries mean a single attempt.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: if config.enabled { config.max_attempts.max(1) } else { 1 },
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }

    /// True when `attempts` made so far leave room for another.
    pub fn allows_another(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}
