//! JWT authentication as a pre-request hook.
//!
//! Validates the `Authorization` header against a signing key fetched during
//! setup. Required-auth routes are rejected with a 401 JSON body when the
//! token is missing or invalid.
//!
//! ```toml
//! [[plugins]]
//! name = "jwt"
//! [plugins.settings]
//! domain = "https://tenant.example.com/"
//! jwks_url = "https://tenant.example.com/.well-known/jwks.json"
//! ```

use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, request, StatusCode};
use serde::Deserialize;

use crate::auth::{resolve_signing_key, TokenValidator, X_USER_ID};
use crate::plugins::{Capabilities, HookRejection, Plugin, PluginError};
use crate::routing::RouteRule;

#[derive(Debug, Deserialize)]
struct JwtSettings {
    domain: String,
    jwks_url: String,
    #[serde(default)]
    audience: Option<String>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Default)]
pub struct JwtPlugin {
    validator: Option<TokenValidator>,
}

impl JwtPlugin {
    pub const NAME: &'static str = "jwt";

    /// A plugin that skips setup and validates with `validator`.
    pub fn with_validator(validator: TokenValidator) -> Self {
        Self {
            validator: Some(validator),
        }
    }

    fn unauthorized() -> HookRejection {
        HookRejection::json(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "Could not validate user credentials",
        )
    }
}

#[async_trait]
impl Plugin for JwtPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            setup: self.validator.is_none(),
            pre_request: true,
            post_request: false,
        }
    }

    async fn setup(&mut self, settings: &toml::Value) -> Result<(), PluginError> {
        let settings: JwtSettings = settings
            .clone()
            .try_into()
            .map_err(|e| PluginError::settings(Self::NAME, e))?;

        let client = reqwest::Client::new();
        let key = resolve_signing_key(
            &client,
            &settings.jwks_url,
            Duration::from_secs(settings.timeout_secs),
        )
        .await
        .map_err(|source| PluginError::KeyMaterial {
            plugin: Self::NAME.to_string(),
            source,
        })?;

        let mut validator = TokenValidator::new(key, settings.domain);
        if let Some(audience) = settings.audience {
            validator = validator.with_audience(audience);
        }
        self.validator = Some(validator);
        Ok(())
    }

    async fn pre_request(
        &self,
        request: &mut request::Parts,
        route: &RouteRule,
    ) -> Result<(), HookRejection> {
        let Some(validator) = &self.validator else {
            tracing::error!(plugin = Self::NAME, "Plugin used before setup");
            return Err(Self::unauthorized());
        };

        request.headers.remove(X_USER_ID);
        let authorization = request
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        match validator.validate(authorization, !route.optional_auth()) {
            Ok(Some(user)) => {
                user.attach_to(request);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(_) => Err(Self::unauthorized()),
        }
    }
}
