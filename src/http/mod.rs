//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, tracing span)
//!     → cors.rs (/api/* cross-origin policy)
//!     → chat.rs (health, chat relay → upstream)
//!     → registration.rs (session endpoints → registration flow)
//!     → response.rs (errors as JSON)
//! ```

pub mod chat;
pub mod cors;
pub mod registration;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::ApiError;
pub use server::{AppState, HttpServer};
