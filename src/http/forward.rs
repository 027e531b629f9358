//! Backend forwarding.
//!
//! # Responsibilities
//! - Resolve the (prefix-stripped) request path against a service base URL
//! - Send the request through a pooled hyper client
//! - Relay the backend's status, headers and body
//!
//! # Design Decisions
//! - Hop-by-hop headers are stripped in both directions
//! - `host` is set by the client from the target URI
//! - Connection failures and timeouts are reported, not retried

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, request, HeaderMap, HeaderName, Request, Uri};
use axum::response::Response;
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;
use url::Url;

use crate::routing::ServiceEndpoint;

const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("cannot build backend url: {0}")]
    Target(#[from] url::ParseError),

    #[error("backend url is not a valid request uri: {0}")]
    Uri(#[from] axum::http::uri::InvalidUri),

    #[error("backend request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("backend did not respond within {0:?}")]
    Timeout(Duration),
}

/// Pooled HTTP client bound to the configured timeouts.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl Forwarder {
    /// `connect_timeout` bounds TCP connection setup, `timeout` bounds the
    /// wait for response headers.
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client, timeout }
    }

    /// Send the request described by `parts` and `body` to `endpoint`.
    ///
    /// `path` is the request path after prefix stripping; the query string is
    /// taken from the inbound URI.
    pub async fn forward(
        &self,
        parts: &request::Parts,
        body: Body,
        endpoint: &ServiceEndpoint,
        path: &str,
    ) -> Result<Response, ForwardError> {
        let target = backend_url(&endpoint.base_url, path, parts.uri.query())?;
        let uri: Uri = target.as_str().parse()?;

        let mut headers = parts.headers.clone();
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);

        let mut outbound = Request::new(body);
        *outbound.method_mut() = parts.method.clone();
        *outbound.uri_mut() = uri;
        *outbound.headers_mut() = headers;

        tracing::debug!(
            service = %endpoint.name,
            target = %target,
            "Forwarding request"
        );

        let response: hyper::Response<Incoming> =
            tokio::time::timeout(self.timeout, self.client.request(outbound))
                .await
                .map_err(|_| ForwardError::Timeout(self.timeout))??;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Resolve `path` (plus `query`) against `base` as a URL reference.
///
/// An absolute path replaces the base path; a relative one is appended to the
/// base's last directory. Repeated leading slashes collapse to one so the
/// result always stays on the service's host.
pub fn backend_url(base: &Url, path: &str, query: Option<&str>) -> Result<Url, url::ParseError> {
    let is_separator = |c: char| c == '/' || c == '\\';

    let mut reference = if path.starts_with(is_separator) {
        format!("/{}", path.trim_start_matches(is_separator))
    } else if path.is_empty() {
        String::new()
    } else {
        // keeps "a:b" from parsing as a scheme
        format!("./{path}")
    };

    if let Some(query) = query {
        reference.push('?');
        reference.push_str(query);
    }

    base.join(&reference)
}

/// Remove hop-by-hop headers, including any named by `connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn base(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn test_absolute_path_replaces_base_path() {
        let url = backend_url(&base("http://svc-a:8080"), "/users/42", None).unwrap();
        assert_eq!(url.as_str(), "http://svc-a:8080/users/42");

        let url = backend_url(&base("http://svc-a:8080/v1/"), "/users/42", None).unwrap();
        assert_eq!(url.as_str(), "http://svc-a:8080/users/42");
    }

    #[test]
    fn test_relative_path_extends_base_directory() {
        let url = backend_url(&base("http://svc-a:8080/v1/"), "users/42", None).unwrap();
        assert_eq!(url.as_str(), "http://svc-a:8080/v1/users/42");

        let url = backend_url(&base("http://svc-a:8080/v1/"), "a:b", None).unwrap();
        assert_eq!(url.as_str(), "http://svc-a:8080/v1/a:b");
    }

    #[test]
    fn test_empty_path_keeps_base() {
        let url = backend_url(&base("http://svc-a:8080/v1/"), "", None).unwrap();
        assert_eq!(url.as_str(), "http://svc-a:8080/v1/");
    }

    #[test]
    fn test_query_is_preserved() {
        let url = backend_url(&base("http://svc-a:8080"), "/search", Some("q=rust&page=2")).unwrap();
        assert_eq!(url.as_str(), "http://svc-a:8080/search?q=rust&page=2");
    }

    #[test]
    fn test_stays_on_service_host() {
        let url = backend_url(&base("http://svc-a:8080"), "//evil.example.com/x", None).unwrap();
        assert_eq!(url.host_str(), Some("svc-a"));
        assert_eq!(url.path(), "/evil.example.com/x");

        let url = backend_url(&base("http://svc-a:8080"), "/\\evil.example.com/x", None).unwrap();
        assert_eq!(url.host_str(), Some("svc-a"));
    }

    #[test]
    fn test_routed_path_resolves_against_service() {
        use crate::config::{GatewayConfig, RouteConfig, ServiceConfig};
        use crate::routing::RouteTable;

        let mut config = GatewayConfig::default();
        config.services.push(ServiceConfig {
            name: "svc-a".into(),
            url: "http://svc-a:8080".into(),
        });
        config.routes.push(RouteConfig {
            path: "/users".into(),
            service: "svc-a".into(),
            strip_prefix: "/api".into(),
            optional_auth: false,
        });
        let table = RouteTable::from_config(&config).unwrap();

        let (rule, endpoint) = table.resolve("/api/users/42").unwrap();
        let url = backend_url(&endpoint.base_url, rule.stripped_path("/api/users/42"), None).unwrap();
        assert_eq!(url.as_str(), "http://svc-a:8080/users/42");
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", HeaderValue::from_static("close, x-private"));
        headers.insert("x-private", HeaderValue::from_static("1"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("authorization", HeaderValue::from_static("Bearer t"));
        headers.insert("x-user-id", HeaderValue::from_static("abc123"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 2);
        assert!(headers.contains_key("authorization"));
        assert!(headers.contains_key("x-user-id"));
    }
}
