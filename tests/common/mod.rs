//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use gatekeeper::config::GatewayConfig;
use gatekeeper::{GatewayServer, Shutdown};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub const PRIMARY_KEY_PEM: &str = include_str!("../fixtures/rsa_primary_key.pem");
pub const ROGUE_KEY_PEM: &str = include_str!("../fixtures/rsa_rogue_key.pem");
pub const PRIMARY_X5C: &str = include_str!("../fixtures/rsa_primary_x5c.txt");
pub const KID: &str = "gatekeeper-test-key";
pub const ISSUER: &str = "https://tenant.example.com/";

/// A running backend that echoes what it received as JSON.
pub struct Backend {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicUsize>,
}

impl Backend {
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Start a backend answering every request with
/// `{"method", "path", "query", "headers"}`.
///
/// Paths of the form `/status/<code>` answer with that status code. Every
/// response carries `server: echo-backend` and `x-backend: echo`.
pub async fn start_echo_backend() -> Backend {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let app = Router::new().fallback(move |request: Request<Body>| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            echo(request)
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Backend { addr, hits }
}

fn echo(request: Request<Body>) -> impl IntoResponse {
    let headers: Map<String, Value> = request
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                Value::String(value.to_str().unwrap_or_default().to_string()),
            )
        })
        .collect();

    let path = request.uri().path().to_string();
    let status = path
        .strip_prefix("/status/")
        .and_then(|code| code.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);

    (
        status,
        [("server", "echo-backend"), ("x-backend", "echo")],
        Json(json!({
            "method": request.method().as_str(),
            "path": path,
            "query": request.uri().query(),
            "headers": headers,
        })),
    )
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Start a JWKS endpoint serving the primary test certificate.
/// Returns the key set URL.
pub async fn start_jwks_server() -> String {
    let document = json!({
        "keys": [{
            "alg": "RS256",
            "kty": "RSA",
            "use": "sig",
            "kid": KID,
            "x5c": [PRIMARY_X5C.trim()]
        }]
    });

    let app = Router::new().route(
        "/.well-known/jwks.json",
        get(move || {
            let document = document.clone();
            async move { Json(document) }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{addr}/.well-known/jwks.json")
}

pub fn claims() -> Value {
    json!({
        "iss": ISSUER,
        "sub": "auth0|abc123",
        "email": "ada@example.com",
        "email_verified": true,
        "picture": "https://cdn.example.com/ada.png",
        "updated_at": "2024-05-01T10:00:00.000Z",
        "exp": 4_102_444_800u64
    })
}

/// Sign `claims` with RS256 under the test key ID.
pub fn mint(private_key_pem: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KID.to_string());
    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

pub fn valid_token() -> String {
    mint(PRIMARY_KEY_PEM, &claims())
}

pub fn parse_config(raw: &str) -> GatewayConfig {
    toml::from_str(raw).unwrap()
}

/// A gateway serving on an ephemeral port. Shuts down on drop.
pub struct Gateway {
    pub addr: SocketAddr,
    pub updates: mpsc::UnboundedSender<GatewayConfig>,
    shutdown: Shutdown,
}

impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn spawn_gateway(server: GatewayServer) -> Gateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let (updates, config_updates) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    Gateway {
        addr,
        updates,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
