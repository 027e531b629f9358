//! Bearer token validation.
//!
//! # Validation Flow
//!
//! 1. Strip the scheme label from the `Authorization` header
//! 2. Reject tokens whose header is not RS256/RS384/RS512, or whose `alg`
//!    or `kid` differ from the resolved signing key
//! 3. Verify the signature (and `exp`/`nbf` when present)
//! 4. Check `iss` against the configured domain
//! 5. Build an [`AuthenticatedUser`] from the identity claims
//!
//! Optional routes never fail on a missing or unverifiable token, but an
//! unverified token is still decoded so that a foreign issuer is rejected.
//! An identity is only returned for a verified token.
//!
//! Callers only ever see [`AuthFailure`]; the specific reason is logged.

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::auth::identity::{check_issuer, AuthenticatedUser};
use crate::auth::jwks::{is_rsa, SigningKey};
use crate::observability::metrics;

type Claims = Map<String, Value>;

/// Generic authentication failure, the only error callers see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("authorization failed")]
pub struct AuthFailure;

/// Internal reason a token was rejected. Logged, never returned to callers.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(#[source] jsonwebtoken::errors::Error),

    #[error("token algorithm {0:?} is not an RSA algorithm")]
    UnsupportedAlgorithm(Algorithm),

    #[error("token algorithm {token:?} does not match signing key algorithm {key:?}")]
    AlgorithmMismatch { token: Algorithm, key: Algorithm },

    #[error("token key id {0:?} does not match the signing key")]
    KeyIdMismatch(Option<String>),

    #[error("token verification failed: {0}")]
    Verification(#[source] jsonwebtoken::errors::Error),

    #[error("token issuer {0:?} is not the configured domain")]
    Issuer(Option<String>),

    #[error("invalid identity claims: {0}")]
    Claims(#[source] serde_json::Error),

    #[error("subject '{0}' has no identity provider prefix")]
    Subject(String),
}

/// Validates bearer tokens against one signing key and issuer.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    key: SigningKey,
    issuer: String,
    audience: Option<String>,
}

impl TokenValidator {
    pub fn new(key: SigningKey, issuer: impl Into<String>) -> Self {
        Self {
            key,
            issuer: issuer.into(),
            audience: None,
        }
    }

    /// Additionally require the `aud` claim to contain `audience`.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Validate an `Authorization` header value.
    ///
    /// Pass an empty string when the header is absent. Returns `Ok(None)` when
    /// `required` is false and no verified identity could be established.
    pub fn validate(
        &self,
        authorization: &str,
        required: bool,
    ) -> Result<Option<AuthenticatedUser>, AuthFailure> {
        let token = bearer_token(authorization);

        match self.verify(token) {
            Ok(claims) => {
                let user = check_issuer(&claims, &self.issuer)
                    .and_then(|_| AuthenticatedUser::from_claims(claims))
                    .map_err(reject)?;
                tracing::debug!(user_id = %user.user_id, "Token validated");
                Ok(Some(user))
            }
            Err(e) if required => Err(reject(e)),
            Err(e) => {
                tracing::debug!(error = %e, "Unverified token on optional route");
                // claims are still checked, but an unverified identity is never returned
                match decode_unverified(token) {
                    Ok(claims) => {
                        check_issuer(&claims, &self.issuer)
                            .and_then(|_| AuthenticatedUser::from_claims(claims))
                            .map_err(reject)?;
                        Ok(None)
                    }
                    Err(_) => Ok(None),
                }
            }
        }
    }

    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let header = decode_header(token).map_err(TokenError::Malformed)?;

        if !is_rsa(&header.alg) {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }
        if header.alg != self.key.algorithm() {
            return Err(TokenError::AlgorithmMismatch {
                token: header.alg,
                key: self.key.algorithm(),
            });
        }
        if header.kid.as_deref() != Some(self.key.key_id()) {
            return Err(TokenError::KeyIdMismatch(header.kid));
        }

        let mut validation = Validation::new(self.key.algorithm());
        validation.required_spec_claims.clear();
        validation.validate_nbf = true;
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        decode::<Claims>(token, self.key.decoding_key(), &validation)
            .map(|data| data.claims)
            .map_err(TokenError::Verification)
    }
}

/// The token part of an `Authorization` header: everything after the first
/// space. A header without a space yields an empty token.
pub fn bearer_token(authorization: &str) -> &str {
    if authorization.is_empty() {
        return "";
    }
    authorization
        .split_once(' ')
        .map(|(_, token)| token)
        .unwrap_or("")
}

/// Decode claims without checking the signature or expiry.
fn decode_unverified(token: &str) -> Result<Claims, TokenError> {
    let header = decode_header(token).map_err(TokenError::Malformed)?;

    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_aud = false;

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(TokenError::Malformed)
}

fn reject(error: TokenError) -> AuthFailure {
    tracing::warn!(error = %error, "Token rejected");
    metrics::record_auth_failure();
    AuthFailure
}
