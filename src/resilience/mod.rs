//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Chat turn to upstream LLM:
//!     → reqwest per-request timeout
//!     → On failure: retries.rs (classify, consult attempt budget)
//!     → backoff.rs (exponential delay with jitter)
//! ```
//!
//! # Design Decisions
//! - Every upstream call has a deadline
//! - Retries are opt-in: a chat turn costs tokens
//! - 429 is surfaced to the user, never retried

pub mod backoff;
pub mod retries;
