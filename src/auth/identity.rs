//! Identity extraction from verified token claims.

use axum::http::{request, HeaderValue};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::auth::validator::TokenError;
use crate::auth::X_USER_ID;

/// Identity of the caller, built fresh for each successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Subject with the identity-provider prefix removed.
    pub user_id: String,
    pub email: String,
    pub email_verified: bool,
    /// Avatar URL.
    pub picture: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
struct IdentityClaims {
    sub: String,
    email: String,
    email_verified: bool,
    picture: String,
    updated_at: String,
}

impl AuthenticatedUser {
    /// Build a user from a claim set. Every identity claim must be present
    /// and correctly typed.
    pub(crate) fn from_claims(claims: Map<String, Value>) -> Result<Self, TokenError> {
        let claims: IdentityClaims =
            serde_json::from_value(Value::Object(claims)).map_err(TokenError::Claims)?;

        let user_id = stable_id(&claims.sub)
            .ok_or_else(|| TokenError::Subject(claims.sub.clone()))?
            .to_string();

        Ok(Self {
            user_id,
            email: claims.email,
            email_verified: claims.email_verified,
            picture: claims.picture,
            updated_at: claims.updated_at,
        })
    }

    /// Expose the identity to later pipeline stages (request extensions) and
    /// to the backend (`x-user-id`).
    pub fn attach_to(self, request: &mut request::Parts) {
        match HeaderValue::from_str(&self.user_id) {
            Ok(value) => {
                request.headers.insert(X_USER_ID, value);
            }
            Err(_) => {
                tracing::warn!(user_id = %self.user_id, "User id is not a valid header value");
            }
        }
        request.extensions.insert(self);
    }
}

/// `auth0|abc123` → `abc123`.
fn stable_id(subject: &str) -> Option<&str> {
    subject.split_once('|').map(|(_, id)| id)
}

/// Fails unless the `iss` claim equals `domain`. A missing issuer fails too.
pub(crate) fn check_issuer(claims: &Map<String, Value>, domain: &str) -> Result<(), TokenError> {
    match claims.get("iss").and_then(Value::as_str) {
        Some(issuer) if issuer == domain => Ok(()),
        other => Err(TokenError::Issuer(other.map(str::to_string))),
    }
}
