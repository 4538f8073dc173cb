//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming chat request:
//!     → rate_limit.rs (per-IP token bucket; protects the upstream quota)
//!     → chat handler
//! ```
//!
//! The upstream credential lives only in server config; clients never see it.

pub mod rate_limit;
