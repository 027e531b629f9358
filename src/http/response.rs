//! Caller-visible error responses.
//!
//! Every gateway-generated failure uses the same JSON body:
//! `{"error": "<short label>", "message": "<detail>"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use crate::config::{ErrorTemplate, ErrorsConfig};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// A status code with an [`ErrorBody`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    status: StatusCode,
    body: ErrorBody,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                message: message.into(),
            },
        }
    }

    /// Build from configuration, using `fallback` if the status is not a
    /// valid HTTP status code.
    pub fn from_template(template: &ErrorTemplate, fallback: StatusCode) -> Self {
        let status = StatusCode::from_u16(template.status).unwrap_or(fallback);
        Self::new(status, template.error.clone(), template.message.clone())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ErrorBody {
        &self.body
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// The three error categories the dispatcher produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponses {
    /// No route matched, or the route's service is unknown.
    pub not_found: ErrorResponse,
    /// Authentication failed on a route that requires it.
    pub unauthorized: ErrorResponse,
    /// The backend was unreachable or timed out.
    pub service_unavailable: ErrorResponse,
}

impl ErrorResponses {
    pub fn from_config(config: &ErrorsConfig) -> Self {
        Self {
            not_found: ErrorResponse::from_template(&config.not_found, StatusCode::NOT_FOUND),
            unauthorized: ErrorResponse::from_template(
                &config.unauthorized,
                StatusCode::UNAUTHORIZED,
            ),
            service_unavailable: ErrorResponse::from_template(
                &config.service_unavailable,
                StatusCode::BAD_GATEWAY,
            ),
        }
    }
}

impl Default for ErrorResponses {
    fn default() -> Self {
        Self::from_config(&ErrorsConfig::default())
    }
}
