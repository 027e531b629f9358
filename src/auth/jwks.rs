//! Signing key resolution from a JSON Web Key Set.
//!
//! The key set is fetched once at startup. The first key in the set is used,
//! and its public key is taken from the first certificate of its `x5c` chain.
//! There is no background refresh: rotating keys at the identity provider
//! requires a restart.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use thiserror::Error;
use x509_parser::pem::parse_x509_pem;
use x509_parser::public_key::PublicKey;

/// Errors resolving the signing key. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to fetch JWKS from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("JWKS fetch from {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("JWKS endpoint {url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("malformed JWKS document: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("JWKS document contains no keys")]
    Empty,

    #[error("key '{0}' has no certificate chain")]
    MissingCertificate(String),

    #[error("key certificate is invalid: {0}")]
    Certificate(String),

    #[error("key certificate does not hold an RSA public key")]
    NotRsa,

    #[error("unsupported signing algorithm '{0}'")]
    Algorithm(String),
}

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<JwksKey>,
}

#[derive(Debug, Deserialize)]
struct JwksKey {
    kid: String,
    alg: String,
    #[serde(default)]
    x5c: Vec<String>,
}

/// Verification material for inbound tokens.
#[derive(Clone)]
pub struct SigningKey {
    key_id: String,
    algorithm: Algorithm,
    decoding_key: DecodingKey,
}

impl SigningKey {
    /// Build a key from a JWKS entry's identifier, algorithm and base64 DER certificate.
    pub fn from_certificate(key_id: &str, algorithm: &str, certificate: &str) -> Result<Self, KeyError> {
        let algorithm = Algorithm::from_str(algorithm)
            .ok()
            .filter(is_rsa)
            .ok_or_else(|| KeyError::Algorithm(algorithm.to_string()))?;

        Ok(Self {
            key_id: key_id.to_string(),
            algorithm,
            decoding_key: rsa_key_from_certificate(certificate)?,
        })
    }

    /// Select the first key of a JWKS document.
    pub fn from_jwks(document: &[u8]) -> Result<Self, KeyError> {
        let document: JwksDocument = serde_json::from_slice(document).map_err(KeyError::Malformed)?;
        let key = document.keys.into_iter().next().ok_or(KeyError::Empty)?;
        let certificate = key
            .x5c
            .first()
            .ok_or_else(|| KeyError::MissingCertificate(key.kid.clone()))?;

        Self::from_certificate(&key.kid, &key.alg, certificate)
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Fetch the key set at `url` and select its signing key.
pub async fn resolve_signing_key(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<SigningKey, KeyError> {
    let fetch_error = |source: reqwest::Error| {
        if source.is_timeout() {
            KeyError::Timeout {
                url: url.to_string(),
                timeout,
            }
        } else {
            KeyError::Fetch {
                url: url.to_string(),
                source,
            }
        }
    };

    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(fetch_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(KeyError::Status {
            url: url.to_string(),
            status,
        });
    }

    let body = response.bytes().await.map_err(fetch_error)?;
    let key = SigningKey::from_jwks(&body)?;

    tracing::info!(
        jwks_url = %url,
        kid = %key.key_id(),
        alg = ?key.algorithm(),
        "Signing key resolved"
    );
    Ok(key)
}

/// Returns true for the RSA PKCS#1 v1.5 family (RS256, RS384, RS512).
pub(crate) fn is_rsa(algorithm: &Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512
    )
}

fn rsa_key_from_certificate(certificate: &str) -> Result<DecodingKey, KeyError> {
    let pem = format!(
        "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
        certificate.trim()
    );

    let (_, pem) =
        parse_x509_pem(pem.as_bytes()).map_err(|e| KeyError::Certificate(e.to_string()))?;
    let cert = pem
        .parse_x509()
        .map_err(|e| KeyError::Certificate(e.to_string()))?;

    let spki = cert.public_key();
    match spki.parsed() {
        Ok(PublicKey::RSA(_)) => Ok(DecodingKey::from_rsa_der(&spki.subject_public_key.data)),
        Ok(_) => Err(KeyError::NotRsa),
        Err(e) => Err(KeyError::Certificate(e.to_string())),
    }
}
