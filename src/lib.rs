//! gatekeeper: an authenticating HTTP API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ http::dispatch ──▶ routing (regex match, strip prefix)
//!                                          │
//!                                          ├──▶ auth (JWT against JWKS-derived key)
//!                                          ├──▶ plugins (pre-request hooks, in order)
//!                                          ├──▶ http::forward ──────────────────────────▶ Backend
//!                                          └──▶ plugins (post-request hooks, in order)
//!     ◀────────────── response relayed (or gateway error body)
//!
//!     Cross-cutting: config (TOML, hot reload) · observability · lifecycle
//! ```

pub mod auth;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod plugins;
pub mod routing;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
