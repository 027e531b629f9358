//! Logs every hook invocation. Useful for checking plugin wiring.

use async_trait::async_trait;
use axum::http::request;
use axum::response::Response;

use crate::plugins::{Capabilities, HookRejection, Plugin, PluginError};
use crate::routing::RouteRule;

#[derive(Debug, Default)]
pub struct SamplePlugin;

impl SamplePlugin {
    pub const NAME: &'static str = "sample";
}

#[async_trait]
impl Plugin for SamplePlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            setup: true,
            pre_request: true,
            post_request: true,
        }
    }

    async fn setup(&mut self, _settings: &toml::Value) -> Result<(), PluginError> {
        tracing::info!(plugin = Self::NAME, "Setting up sample plugin");
        Ok(())
    }

    async fn pre_request(
        &self,
        request: &mut request::Parts,
        route: &RouteRule,
    ) -> Result<(), HookRejection> {
        tracing::info!(
            plugin = Self::NAME,
            path = %request.uri.path(),
            route = %route.pattern(),
            "Running sample pre request"
        );
        Ok(())
    }

    async fn post_request(
        &self,
        request: &request::Parts,
        response: &mut Response,
        _route: &RouteRule,
    ) -> Result<(), HookRejection> {
        tracing::info!(
            plugin = Self::NAME,
            path = %request.uri.path(),
            status = %response.status(),
            "Running sample post request"
        );
        Ok(())
    }
}
