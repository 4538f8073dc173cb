//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, apply GROQ_*/OUTPUT_DIR/HOST/PORT env)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so the server runs from the environment alone
//! - Validation separates syntactic (serde) from semantic checks
//! - The API key is never serialized back out

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{from_env, load_config, ConfigError};
pub use schema::{
    AppConfig, ContextConfig, CorsConfig, ListenerConfig, ObservabilityConfig, RateLimitConfig,
    RegistrationConfig, RetryConfig, TimeoutConfig, UpstreamConfig,
};
