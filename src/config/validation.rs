//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, temperature bounds)
//! - Validate addresses and URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - A missing API key is not an error here; it is reported per request

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;
use url::Url;

use crate::config::schema::AppConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// `HOST` may be a name such as `localhost`, so only the shape is checked.
fn is_bind_address(raw: &str) -> bool {
    if raw.parse::<SocketAddr>().is_ok() {
        return true;
    }
    match raw.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty() && !host.contains(char::is_whitespace) && port.parse::<u16>().is_ok()
        }
        None => false,
    }
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_bind_address(&config.listener.bind_address) {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a host:port address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be greater than 0"));
    }

    match Url::parse(&config.upstream.api_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "upstream.api_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("upstream.api_url", e.to_string())),
    }
    if config.upstream.default_model.trim().is_empty() {
        errors.push(ValidationError::new("upstream.default_model", "must not be empty"));
    }
    if !(0.0..=2.0).contains(&config.upstream.default_temperature) {
        errors.push(ValidationError::new(
            "upstream.default_temperature",
            "must be between 0 and 2",
        ));
    }

    if config.context.max_chars == 0 {
        errors.push(ValidationError::new("context.max_chars", "must be greater than 0"));
    }

    for origin in &config.cors.allowed_origins {
        if origin == "*" {
            continue;
        }
        let parses = Url::parse(origin).is_ok() && HeaderValue::from_str(origin).is_ok();
        if !parses {
            errors.push(ValidationError::new(
                "cors.allowed_origins",
                format!("'{}' is not a valid origin", origin),
            ));
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }

    if config.rate_limit.enabled
        && (config.rate_limit.requests_per_second <= 0.0 || config.rate_limit.burst_size == 0)
    {
        errors.push(ValidationError::new(
            "rate_limit",
            "requests_per_second and burst_size must be positive when enabled",
        ));
    }

    if config.registration.session_ttl_secs == 0 {
        errors.push(ValidationError::new(
            "registration.session_ttl_secs",
            "must be greater than 0",
        ));
    }
    if config.registration.sweep_interval_secs == 0 {
        errors.push(ValidationError::new(
            "registration.sweep_interval_secs",
            "must be greater than 0",
        ));
    }
    if config.registration.max_sessions == 0 {
        errors.push(ValidationError::new("registration.max_sessions", "must be greater than 0"));
    }
    if config.registration.max_text_chars == 0 {
        errors.push(ValidationError::new("registration.max_text_chars", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.upstream.api_url = "ftp://example.com/chat".into();
        config.upstream.default_temperature = 3.5;
        config.context.max_chars = 0;
        config.retries.max_attempts = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "upstream.api_url",
                "upstream.default_temperature",
                "context.max_chars",
                "retries.max_attempts",
            ]
        );
    }

    #[test]
    fn bind_address_may_use_a_host_name() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "localhost:5000".into();
        assert!(validate_config(&config).is_ok());

        config.listener.bind_address = "localhost:99999".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_malformed_origin() {
        let mut config = AppConfig::default();
        config.cors.allowed_origins = vec!["https://clinic.example".into(), "clinic".into()];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "cors.allowed_origins");
    }

    #[test]
    fn rate_limit_checked_only_when_enabled() {
        let mut config = AppConfig::default();
        config.rate_limit.burst_size = 0;
        assert!(validate_config(&config).is_ok());

        config.rate_limit.enabled = true;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn registration_caps_must_be_positive() {
        let mut config = AppConfig::default();
        config.registration.max_sessions = 0;
        config.registration.max_text_chars = 0;
        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["registration.max_sessions", "registration.max_text_chars"]
        );
    }
}
