//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TcpListener
//!     → server.rs (Axum router, middleware layers)
//!     → request.rs (request ID assigned)
//!     → dispatch.rs (route, auth, plugins)
//!     → forward.rs (backend call, hop-by-hop stripping)
//!     → response.rs (gateway-generated error bodies)
//! ```

pub mod dispatch;
pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{ForwardError, Forwarder};
pub use response::{ErrorResponse, ErrorResponses};
pub use server::{AppState, GatewayServer};
