//! Ordered hook registries.

use std::fmt;
use std::sync::Arc;

use axum::http::request;
use axum::response::Response;
use thiserror::Error;

use crate::config::PluginConfig;
use crate::observability::metrics;
use crate::plugins::{Plugin, PluginCatalog, PluginError};
use crate::routing::RouteRule;

/// Which hook chain a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    PreRequest,
    PostRequest,
}

impl HookStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookStage::PreRequest => "pre_request",
            HookStage::PostRequest => "post_request",
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hook rejected the request. `response` is what the hook wrote.
#[derive(Debug, Error)]
#[error("plugin '{plugin}' rejected the request in {stage}")]
pub struct PluginFailure {
    pub plugin: String,
    pub stage: HookStage,
    pub response: Response,
}

/// Pre- and post-request hooks in registration order.
#[derive(Default)]
pub struct PluginRegistry {
    pre_request: Vec<Arc<dyn Plugin>>,
    post_request: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate and register every configured plugin, in order.
    ///
    /// Names missing from the catalog are logged and skipped. Setup errors
    /// are returned.
    pub async fn load(configs: &[PluginConfig], catalog: &PluginCatalog) -> Result<Self, PluginError> {
        let mut registry = Self::new();

        for config in configs {
            let Some(plugin) = catalog.create(&config.name) else {
                tracing::warn!(plugin = %config.name, "Unknown plugin, skipping");
                continue;
            };
            registry.register(plugin, &config.settings).await?;
        }

        tracing::info!(
            pre_request = registry.pre_request.len(),
            post_request = registry.post_request.len(),
            "Plugins loaded"
        );
        Ok(registry)
    }

    /// Run the plugin's setup hook (if any) and append its request hooks.
    pub async fn register(
        &mut self,
        mut plugin: Box<dyn Plugin>,
        settings: &toml::Value,
    ) -> Result<(), PluginError> {
        let capabilities = plugin.capabilities();

        if capabilities.setup {
            plugin.setup(settings).await?;
        }

        let plugin: Arc<dyn Plugin> = Arc::from(plugin);
        if capabilities.pre_request {
            self.pre_request.push(plugin.clone());
        }
        if capabilities.post_request {
            self.post_request.push(plugin.clone());
        }

        tracing::info!(
            plugin = %plugin.name(),
            pre_request = capabilities.pre_request,
            post_request = capabilities.post_request,
            "Plugin registered"
        );
        Ok(())
    }

    /// Run pre-request hooks until one rejects.
    pub async fn run_pre_request(
        &self,
        request: &mut request::Parts,
        route: &RouteRule,
    ) -> Result<(), PluginFailure> {
        for plugin in &self.pre_request {
            if let Err(rejection) = plugin.pre_request(request, route).await {
                return Err(failure(plugin.as_ref(), HookStage::PreRequest, rejection.into_response()));
            }
        }
        Ok(())
    }

    /// Run post-request hooks until one rejects.
    pub async fn run_post_request(
        &self,
        request: &request::Parts,
        response: &mut Response,
        route: &RouteRule,
    ) -> Result<(), PluginFailure> {
        for plugin in &self.post_request {
            if let Err(rejection) = plugin.post_request(request, response, route).await {
                return Err(failure(plugin.as_ref(), HookStage::PostRequest, rejection.into_response()));
            }
        }
        Ok(())
    }

    pub fn pre_request_count(&self) -> usize {
        self.pre_request.len()
    }

    pub fn post_request_count(&self) -> usize {
        self.post_request.len()
    }
}

fn failure(plugin: &dyn Plugin, stage: HookStage, response: Response) -> PluginFailure {
    tracing::info!(
        plugin = %plugin.name(),
        stage = %stage,
        status = %response.status(),
        "Plugin rejected request"
    );
    metrics::record_plugin_rejection(plugin.name(), stage);
    PluginFailure {
        plugin: plugin.name().to_string(),
        stage,
        response,
    }
}
