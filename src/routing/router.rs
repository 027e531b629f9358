//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes and the service endpoint map
//! - Resolve a request path to its rule and endpoint
//! - Return an explicit not-found reason rather than a silent default
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Rebuilt wholesale and swapped on config reload, never patched in place
//! - O(1) service lookup via HashMap
//! - O(n) pattern scan (acceptable for typical route counts)

use std::collections::HashMap;

use thiserror::Error;
use url::Url;

use crate::config::validation::check_service_url;
use crate::config::GatewayConfig;
use crate::routing::matcher::{RouteMatcher, RouteRule};

/// A backend requests are forwarded to.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceEndpoint {
    pub name: String,
    pub base_url: Url,
}

/// Why a path could not be resolved to a backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteNotFound {
    #[error("no route matches '{0}'")]
    NoRoute(String),

    #[error("route '{pattern}' names unknown service '{service}'")]
    UnknownService { pattern: String, service: String },
}

/// Errors building a route table from configuration.
#[derive(Debug, Error)]
pub enum RouteTableError {
    #[error("invalid route pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("service '{name}' has an invalid url: {reason}")]
    ServiceUrl { name: String, reason: String },
}

/// Compiled routes plus the services they point to.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    matcher: RouteMatcher,
    services: HashMap<String, ServiceEndpoint>,
}

impl RouteTable {
    pub fn new(matcher: RouteMatcher, services: Vec<ServiceEndpoint>) -> Self {
        let services = services
            .into_iter()
            .map(|svc| (svc.name.clone(), svc))
            .collect();
        Self { matcher, services }
    }

    /// Compile routes and resolve service URLs from configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, RouteTableError> {
        let matcher = RouteMatcher::compile(&config.routes)?;

        let mut services = Vec::with_capacity(config.services.len());
        for svc in &config.services {
            let base_url = check_service_url(&svc.url).map_err(|reason| {
                RouteTableError::ServiceUrl {
                    name: svc.name.clone(),
                    reason,
                }
            })?;
            services.push(ServiceEndpoint {
                name: svc.name.clone(),
                base_url,
            });
        }

        Ok(Self::new(matcher, services))
    }

    /// Find the rule for `path` and the endpoint it targets.
    pub fn resolve(&self, path: &str) -> Result<(&RouteRule, &ServiceEndpoint), RouteNotFound> {
        let rule = self
            .matcher
            .match_path(path)
            .ok_or_else(|| RouteNotFound::NoRoute(path.to_string()))?;

        let endpoint = self
            .services
            .get(rule.service())
            .ok_or_else(|| RouteNotFound::UnknownService {
                pattern: rule.pattern().to_string(),
                service: rule.service().to_string(),
            })?;

        Ok((rule, endpoint))
    }

    pub fn route_count(&self) -> usize {
        self.matcher.len()
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}
