//! Clinic assistant gateway library.
//!
//! A same-origin gateway for a clinic chat widget: relays conversation turns
//! to a hosted LLM without exposing the API key, and runs the patient
//! registration conversation as server-side sessions.

// Core subsystems
pub mod config;
pub mod context;
pub mod http;
pub mod registration;
pub mod upstream;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
