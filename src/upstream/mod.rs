//! Upstream LLM subsystem.
//!
//! # Data Flow
//! ```text
//! chat handler (system prompt + context + client turns)
//!     → client.rs (bearer auth, timeout, optional retries)
//!     → hosted chat-completions API
//!     → types.rs (first choice → Completion, or UpstreamError)
//! ```

pub mod client;
pub mod types;

pub use client::LlmClient;
pub use types::{system_message, Completion, UpstreamError};
