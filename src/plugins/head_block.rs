//! Strips configured headers from requests before forwarding and from
//! backend responses before relaying them.
//!
//! ```toml
//! [[plugins]]
//! name = "head_block"
//! [plugins.settings]
//! inbound = ["cookie", "x-debug"]
//! outbound = ["server", "x-powered-by"]
//! ```

use async_trait::async_trait;
use axum::http::{request, HeaderName};
use axum::response::Response;
use serde::Deserialize;

use crate::plugins::{Capabilities, HookRejection, Plugin, PluginError};
use crate::routing::RouteRule;

#[derive(Debug, Deserialize)]
struct HeadBlockSettings {
    inbound: Vec<String>,
    outbound: Vec<String>,
}

#[derive(Debug, Default)]
pub struct HeadBlockPlugin {
    inbound: Vec<HeaderName>,
    outbound: Vec<HeaderName>,
}

impl HeadBlockPlugin {
    pub const NAME: &'static str = "head_block";
}

fn header_names(names: Vec<String>) -> Result<Vec<HeaderName>, PluginError> {
    names
        .into_iter()
        .map(|name| {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| PluginError::settings(HeadBlockPlugin::NAME, format!("'{name}': {e}")))
        })
        .collect()
}

#[async_trait]
impl Plugin for HeadBlockPlugin {
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

    async fn setup(&mut self, settings: &toml::Value) -> Result<(), PluginError> {
        let settings: HeadBlockSettings = settings
            .clone()
            .try_into()
            .map_err(|e| PluginError::settings(Self::NAME, e))?;

        self.inbound = header_names(settings.inbound)?;
        self.outbound = header_names(settings.outbound)?;
        Ok(())
    }

    async fn pre_request(
        &self,
        request: &mut request::Parts,
        _route: &RouteRule,
    ) -> Result<(), HookRejection> {
        for name in &self.inbound {
            request.headers.remove(name);
        }
        Ok(())
    }

    async fn post_request(
        &self,
        _request: &request::Parts,
        response: &mut Response,
        _route: &RouteRule,
    ) -> Result<(), HookRejection> {
        for name in &self.outbound {
            response.headers_mut().remove(name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use axum::http::Request;

    fn route() -> RouteRule {
        RouteRule::compile(&RouteConfig {
            path: "^/".into(),
            service: "svc".into(),
            strip_prefix: String::new(),
            optional_auth: false,
        })
        .unwrap()
    }

    async fn plugin(settings: &str) -> Result<HeadBlockPlugin, PluginError> {
        let mut plugin = HeadBlockPlugin::default();
        plugin.setup(&toml::from_str(settings).unwrap()).await?;
        Ok(plugin)
    }

    #[tokio::test]
    async fn test_strips_headers_both_ways() {
        let plugin = plugin("inbound = [\"Cookie\"]\noutbound = [\"server\"]")
            .await
            .unwrap();

        let (mut parts, _) = Request::builder()
            .header("cookie", "session=1")
            .header("accept", "text/plain")
            .body(())
            .unwrap()
            .into_parts();
        plugin.pre_request(&mut parts, &route()).await.unwrap();
        assert!(parts.headers.get("cookie").is_none());
        assert!(parts.headers.get("accept").is_some());

        let mut response = Response::builder()
            .header("server", "nginx")
            .header("content-type", "text/plain")
            .body(axum::body::Body::empty())
            .unwrap();
        plugin
            .post_request(&parts, &mut response, &route())
            .await
            .unwrap();
        assert!(response.headers().get("server").is_none());
        assert!(response.headers().get("content-type").is_some());
    }

    #[tokio::test]
    async fn test_missing_lists_fail_setup() {
        assert!(matches!(
            plugin("inbound = [\"cookie\"]").await,
            Err(PluginError::Settings { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_header_name_fails_setup() {
        assert!(matches!(
            plugin("inbound = [\"bad header\"]\noutbound = []").await,
            Err(PluginError::Settings { .. })
        ));
    }
}
