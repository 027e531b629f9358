//! Plugin subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     [[plugins]] config (name + settings)
//!     → catalog.rs (name → compiled-in factory; unknown names skipped)
//!     → registry.rs (setup once, append to pre/post registries)
//!
//! Per request:
//!     pre-request hooks (registration order, stop at first rejection)
//!     → backend call
//!     → post-request hooks (registration order, stop at first rejection)
//! ```
//!
//! # Design Decisions
//! - Plugins are trait objects selected by configuration, not loaded from disk
//! - A plugin declares which hooks it implements; missing hooks are skipped
//! - A rejecting hook supplies the response the caller receives
//! - Registries are immutable once the server starts

pub mod catalog;
pub mod head_block;
pub mod jwt;
pub mod registry;
pub mod sample;

use async_trait::async_trait;
use axum::http::{request, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::auth::KeyError;
use crate::http::response::ErrorResponse;
use crate::routing::RouteRule;

pub use catalog::PluginCatalog;
pub use registry::{HookStage, PluginFailure, PluginRegistry};

/// Hooks a plugin implements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub setup: bool,
    pub pre_request: bool,
    pub post_request: bool,
}

/// A compiled-in middleware unit.
///
/// Only the hooks flagged in [`Plugin::capabilities`] are ever called.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Identifier used in configuration and logs.
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// Called exactly once, before the server accepts traffic, with the
    /// plugin's own settings table.
    async fn setup(&mut self, _settings: &toml::Value) -> Result<(), PluginError> {
        Ok(())
    }

    /// Runs before the backend call. May modify the outbound request.
    async fn pre_request(
        &self,
        _request: &mut request::Parts,
        _route: &RouteRule,
    ) -> Result<(), HookRejection> {
        Ok(())
    }

    /// Runs after the backend responded. May modify or replace the response.
    async fn post_request(
        &self,
        _request: &request::Parts,
        _response: &mut Response,
        _route: &RouteRule,
    ) -> Result<(), HookRejection> {
        Ok(())
    }
}

/// A hook stopped the pipeline. The wrapped response is sent to the caller
/// unchanged.
#[derive(Debug)]
pub struct HookRejection {
    response: Response,
}

impl HookRejection {
    pub fn new(response: Response) -> Self {
        Self { response }
    }

    /// Reject with the gateway's `{"error", "message"}` JSON body.
    pub fn json(status: StatusCode, error: &str, message: &str) -> Self {
        Self::new(ErrorResponse::new(status, error, message).into_response())
    }

    pub fn into_response(self) -> Response {
        self.response
    }
}

/// Plugin setup failures. These abort startup.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin '{plugin}' has invalid settings: {reason}")]
    Settings { plugin: String, reason: String },

    #[error("plugin '{plugin}' could not resolve its signing key: {source}")]
    KeyMaterial {
        plugin: String,
        #[source]
        source: KeyError,
    },
}

impl PluginError {
    pub fn settings(plugin: &str, reason: impl ToString) -> Self {
        PluginError::Settings {
            plugin: plugin.to_string(),
            reason: reason.to_string(),
        }
    }
}
