//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → startup builds route table, validator, plugin registry
//!
//! On file change (--watch):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server rebuilds the route table and swaps it atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Only routes and services are reloadable; signing keys and plugins
//!   are fixed for the process lifetime

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_config_with, ConfigError, Overrides};
pub use schema::{
    AuthConfig, ErrorTemplate, ErrorsConfig, GatewayConfig, ListenerConfig, ObservabilityConfig,
    PluginConfig, RouteConfig, ServiceConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
