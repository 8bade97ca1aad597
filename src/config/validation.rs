//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, port pair fits in u16)
//! - Check that reserved prefixes are well formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::HeaderValue;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{GatewayConfig, API_PREFIX};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.port must be between 1 and 65534 (rpc uses port + 1), got {0}")]
    PortOutOfRange(u16),

    #[error("listener.host '{0}' is not a valid IP address")]
    InvalidHost(String),

    #[error("listener.max_connections must be greater than zero")]
    ZeroConnections,

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("prefix '{0}' must start and end with '/'")]
    MalformedPrefix(String),

    #[error("assets.redirect_prefix '{0}' overlaps the reserved /api/ prefix")]
    RedirectOverlapsApi(String),

    #[error("assets.cache_control '{0}' is not a valid header value")]
    InvalidCacheControl(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let port = config.listener.port;
    if port == 0 || port == u16::MAX {
        errors.push(ValidationError::PortOutOfRange(port));
    }
    if config.listener.host.parse::<std::net::IpAddr>().is_err() {
        errors.push(ValidationError::InvalidHost(config.listener.host.clone()));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroConnections);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }
    if config.timeouts.shutdown_grace_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("shutdown_grace_secs"));
    }

    let prefixes = config
        .assets
        .api_prefixes
        .iter()
        .chain(std::iter::once(&config.assets.redirect_prefix));
    for prefix in prefixes {
        if !is_well_formed_prefix(prefix) {
            errors.push(ValidationError::MalformedPrefix(prefix.clone()));
        }
    }

    let redirect = &config.assets.redirect_prefix;
    if redirect.starts_with(API_PREFIX) || API_PREFIX.starts_with(redirect.as_str()) {
        errors.push(ValidationError::RedirectOverlapsApi(redirect.clone()));
    }

    if HeaderValue::from_str(&config.assets.cache_control).is_err() {
        errors.push(ValidationError::InvalidCacheControl(
            config.assets.cache_control.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_well_formed_prefix(prefix: &str) -> bool {
    prefix.len() >= 2
        && prefix.starts_with('/')
        && prefix.ends_with('/')
        && !prefix.contains("//")
}
