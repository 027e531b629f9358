//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the route table from configuration
//! - Resolve the signing key when built-in authentication is configured
//! - Instantiate and set up plugins in declaration order
//!
//! # Design Decisions
//! - Fail fast: an unreachable JWKS endpoint or a failing plugin setup
//!   aborts startup
//! - Subsystems initialize in order, not concurrently

use std::time::Duration;

use thiserror::Error;

use crate::auth::{resolve_signing_key, KeyError, TokenValidator};
use crate::config::GatewayConfig;
use crate::http::GatewayServer;
use crate::plugins::{PluginCatalog, PluginError, PluginRegistry};
use crate::routing::{RouteTable, RouteTableError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid route table: {0}")]
    Routes(#[from] RouteTableError),

    #[error("cannot resolve signing key: {0}")]
    KeyMaterial(#[from] KeyError),

    #[error("plugin setup failed: {0}")]
    Plugin(#[from] PluginError),
}

/// Initialize every subsystem with the compiled-in plugins.
pub async fn bootstrap(config: GatewayConfig) -> Result<GatewayServer, StartupError> {
    bootstrap_with(config, &PluginCatalog::builtin()).await
}

/// Initialize every subsystem, instantiating plugins from `catalog`.
pub async fn bootstrap_with(
    config: GatewayConfig,
    catalog: &PluginCatalog,
) -> Result<GatewayServer, StartupError> {
    let routes = RouteTable::from_config(&config)?;
    tracing::info!(
        routes = routes.route_count(),
        services = routes.service_count(),
        "Route table built"
    );

    let validator = match &config.auth {
        Some(auth) => {
            let client = reqwest::Client::new();
            let key = resolve_signing_key(
                &client,
                &auth.jwks_url,
                Duration::from_secs(config.timeouts.jwks_secs),
            )
            .await?;

            let mut validator = TokenValidator::new(key, auth.domain.clone());
            if let Some(audience) = &auth.audience {
                validator = validator.with_audience(audience.clone());
            }
            tracing::info!(issuer = %auth.domain, "Built-in authentication enabled");
            Some(validator)
        }
        None => {
            tracing::info!("Built-in authentication disabled");
            None
        }
    };

    let plugins = PluginRegistry::load(&config.plugins, catalog).await?;

    Ok(GatewayServer::new(config, routes, validator, plugins))
}
