//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (route table lookup)
//!     → matcher.rs (evaluate patterns in declaration order)
//!     → Return: matched rule + service endpoint, or RouteNotFound
//!
//! Route Compilation (at startup and on reload):
//!     RouteConfig[] + ServiceConfig[]
//!     → Compile regex patterns
//!     → Resolve service base URLs
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (declaration order)

pub mod matcher;
pub mod router;

pub use matcher::{RouteMatcher, RouteRule};
pub use router::{RouteNotFound, RouteTable, RouteTableError, ServiceEndpoint};
