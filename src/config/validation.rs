//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that route patterns compile and service URLs are usable
//! - Validate value ranges (timeouts > 0, status codes valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - A route naming an unknown service is only a warning: it is answered with
//!   404 at request time

use std::collections::HashSet;

use axum::http::StatusCode;
use thiserror::Error;
use url::Url;

use crate::config::schema::{ErrorTemplate, GatewayConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("route #{index} has an invalid path pattern '{pattern}': {reason}")]
    RoutePattern {
        index: usize,
        pattern: String,
        reason: String,
    },

    #[error("service '{name}' has an invalid url '{url}': {reason}")]
    ServiceUrl {
        name: String,
        url: String,
        reason: String,
    },

    #[error("service #{0} has an empty name")]
    ServiceName(usize),

    #[error("service '{0}' is defined more than once")]
    DuplicateService(String),

    #[error("error body '{name}' has invalid status {status}")]
    ErrorStatus { name: &'static str, status: u16 },

    #[error("timeout '{0}' must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("auth.jwks_url '{url}' is invalid: {reason}")]
    JwksUrl { url: String, reason: String },

    #[error("plugin #{0} has an empty name")]
    PluginName(usize),
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (index, route) in config.routes.iter().enumerate() {
        if let Err(e) = regex::Regex::new(&route.path) {
            errors.push(ValidationError::RoutePattern {
                index,
                pattern: route.path.clone(),
                reason: e.to_string(),
            });
        }
    }

    let mut names = HashSet::new();
    for (index, service) in config.services.iter().enumerate() {
        if service.name.is_empty() {
            errors.push(ValidationError::ServiceName(index));
        } else if !names.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }

        if let Err(reason) = check_service_url(&service.url) {
            errors.push(ValidationError::ServiceUrl {
                name: service.name.clone(),
                url: service.url.clone(),
                reason,
            });
        }
    }

    for route in &config.routes {
        if !names.contains(route.service.as_str()) {
            tracing::warn!(
                pattern = %route.path,
                service = %route.service,
                "Route references an unknown service; matching requests will get 404"
            );
        }
    }

    for (index, plugin) in config.plugins.iter().enumerate() {
        if plugin.name.trim().is_empty() {
            errors.push(ValidationError::PluginName(index));
        }
    }

    check_status("not_found", &config.errors.not_found, &mut errors);
    check_status("unauthorized", &config.errors.unauthorized, &mut errors);
    check_status(
        "service_unavailable",
        &config.errors.service_unavailable,
        &mut errors,
    );

    let timeouts = &config.timeouts;
    for (name, value) in [
        ("request_secs", timeouts.request_secs),
        ("backend_secs", timeouts.backend_secs),
        ("connect_secs", timeouts.connect_secs),
        ("jwks_secs", timeouts.jwks_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    if let Some(auth) = &config.auth {
        if let Err(e) = Url::parse(&auth.jwks_url) {
            errors.push(ValidationError::JwksUrl {
                url: auth.jwks_url.clone(),
                reason: e.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check that a service URL can serve as the base of forwarded requests.
pub(crate) fn check_service_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err("url cannot be used as a base".to_string());
    }
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    Ok(url)
}

fn check_status(name: &'static str, template: &ErrorTemplate, errors: &mut Vec<ValidationError>) {
    if StatusCode::from_u16(template.status).is_err() {
        errors.push(ValidationError::ErrorStatus {
            name,
            status: template.status,
        });
    }
}
