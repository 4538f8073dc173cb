//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the assistant
//! gateway. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the clinic assistant gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Hosted LLM chat-completions endpoint.
    pub upstream: UpstreamConfig,

    /// Source documents injected into every chat turn.
    pub context: ContextConfig,

    /// Cross-origin settings for `/api/*`.
    pub cors: CorsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration for upstream calls.
    pub retries: RetryConfig,

    /// Per-client rate limiting on the chat relay.
    pub rate_limit: RateLimitConfig,

    /// Registration session settings.
    pub registration: RegistrationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Maximum accepted request body in bytes. Document images travel inline,
    /// so this is larger than a plain chat payload needs.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Upstream LLM API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Chat-completions URL (OpenAI-compatible).
    pub api_url: String,

    /// Bearer credential. Usually supplied through `GROQ_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Model used when the client does not name one.
    pub default_model: String,

    /// Sampling temperature used when the client does not send one.
    pub default_temperature: f64,

    /// System prompt placed ahead of every conversation.
    pub system_prompt: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            api_key: None,
            default_model: "openai/gpt-oss-20b".to_string(),
            default_temperature: 0.3,
            system_prompt: "You are a helpful clinic assistant. Answer using only the supplied \
                source documents. If they do not cover a question, say you do not have that \
                information instead of guessing."
                .to_string(),
        }
    }
}

/// Source document context configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Directory scanned for `*.txt` documents.
    pub documents_dir: String,

    /// Character budget for the combined context.
    pub max_chars: usize,

    /// Reload the context when the directory changes.
    pub watch: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            documents_dir: "output".to_string(),
            max_chars: 25_000,
            watch: false,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins. `"*"` allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Upstream request timeout in seconds.
    pub upstream_secs: u64,

    /// Total time allowed for an inbound request in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 60,
            request_secs: 90,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 4000,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Sustained chat requests per second per client IP.
    pub requests_per_second: f64,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 1.0,
            burst_size: 10,
        }
    }
}

/// Registration session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Sessions idle for longer than this are discarded.
    pub session_ttl_secs: u64,

    /// How often the idle sweeper runs.
    pub sweep_interval_secs: u64,

    /// Live sessions allowed at once; creation beyond this is refused.
    pub max_sessions: usize,

    /// Longest message or document text accepted, in characters.
    pub max_text_chars: usize,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 30 * 60,
            sweep_interval_secs: 60,
            max_sessions: 1_000,
            max_text_chars: 20_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
