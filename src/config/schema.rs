//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (host, port).
    pub listener: ListenerConfig,

    /// Route rules, evaluated in declaration order.
    pub routes: Vec<RouteConfig>,

    /// Backing service definitions.
    pub services: Vec<ServiceConfig>,

    /// Plugins to load at startup, in registration order.
    pub plugins: Vec<PluginConfig>,

    /// Built-in JWT authentication. Disabled when absent.
    pub auth: Option<AuthConfig>,

    /// Caller-visible error bodies.
    pub errors: ErrorsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Port to listen on.
    pub port: u16,
}

impl ListenerConfig {
    /// The `host:port` string handed to the TCP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Route rule mapping a path pattern to a service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RouteConfig {
    /// Regular expression searched for anywhere in the request path.
    pub path: String,

    /// Name of the service to forward to.
    pub service: String,

    /// Prefix removed from the request path before forwarding.
    #[serde(default)]
    pub strip_prefix: String,

    /// When true, requests without valid credentials still pass.
    #[serde(default)]
    pub optional_auth: bool,
}

/// Backing service definition.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServiceConfig {
    /// Logical name referenced by routes.
    pub name: String,

    /// Base URL requests are resolved against (e.g., "http://10.0.0.4:8080/v1/").
    pub url: String,
}

/// A plugin to load at startup.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PluginConfig {
    /// Identifier of a compiled-in plugin.
    pub name: String,

    /// Plugin-defined settings, passed verbatim to the plugin's setup hook.
    #[serde(default = "empty_settings")]
    pub settings: toml::Value,
}

fn empty_settings() -> toml::Value {
    toml::Value::Table(toml::map::Map::new())
}

/// JWT authentication settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AuthConfig {
    /// Expected `iss` claim.
    pub domain: String,

    /// Location of the identity provider's JSON Web Key Set.
    pub jwks_url: String,

    /// Expected `aud` claim. Not checked when absent.
    #[serde(default)]
    pub audience: Option<String>,
}

/// The three caller-visible error bodies.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ErrorsConfig {
    pub not_found: ErrorTemplate,
    pub unauthorized: ErrorTemplate,
    pub service_unavailable: ErrorTemplate,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            not_found: ErrorTemplate::new(404, "Not Found", "Could not find route"),
            unauthorized: ErrorTemplate::new(
                401,
                "Authentication Failed",
                "Could not find or process the authentication",
            ),
            service_unavailable: ErrorTemplate::new(
                502,
                "Could Not Process Request",
                "The server was unable to process your request",
            ),
        }
    }
}

/// Status code and JSON body of one error category.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ErrorTemplate {
    /// HTTP status code.
    pub status: u16,

    /// Short label, rendered as `error`.
    pub error: String,

    /// Human-readable detail, rendered as `message`.
    pub message: String,
}

impl ErrorTemplate {
    pub fn new(status: u16, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: message.into(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for an inbound request, in seconds.
    pub request_secs: u64,

    /// Time allowed for a backend to return response headers, in seconds.
    pub backend_secs: u64,

    /// Backend connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// JWKS fetch timeout in seconds.
    pub jwks_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            backend_secs: 15,
            connect_secs: 5,
            jwks_secs: 10,
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Address for the Prometheus scrape endpoint. Metrics export is off when absent.
    pub metrics_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.port, 3000);
        assert_eq!(config.listener.bind_address(), "0.0.0.0:3000");
        assert!(config.auth.is_none());
        assert_eq!(config.errors.not_found.error, "Not Found");
        assert_eq!(config.errors.not_found.message, "Could not find route");
        assert_eq!(config.errors.service_unavailable.status, 502);
    }

    #[test]
    fn test_full_config() {
        let raw = r#"
            [listener]
            port = 8080

            [auth]
            domain = "https://tenant.example.com/"
            jwks_url = "https://tenant.example.com/.well-known/jwks.json"

            [[services]]
            name = "svc-a"
            url = "http://127.0.0.1:9000/"

            [[routes]]
            path = "^/users"
            service = "svc-a"
            strip_prefix = "/api"

            [[routes]]
            path = "^/public"
            service = "svc-a"
            optional_auth = true

            [[plugins]]
            name = "head_block"
            [plugins.settings]
            inbound = ["cookie"]
            outbound = ["server"]

            [[plugins]]
            name = "sample"
        "#;

        let config: GatewayConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.listener.host, "0.0.0.0");
        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[0].strip_prefix, "/api");
        assert!(!config.routes[0].optional_auth);
        assert!(config.routes[1].optional_auth);
        assert_eq!(config.routes[1].strip_prefix, "");
        assert_eq!(config.plugins[0].settings["inbound"][0].as_str(), Some("cookie"));
        assert!(config.plugins[1].settings.as_table().unwrap().is_empty());
        assert_eq!(config.auth.unwrap().audience, None);
    }
}
