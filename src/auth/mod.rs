//! JWT authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     jwks_url → jwks.rs (fetch key set, first key, x5c certificate)
//!     → SigningKey (kid, alg, RSA public key), immutable
//!
//! Per request:
//!     Authorization header → validator.rs (alg/kid checks, signature, issuer)
//!     → identity.rs (typed claim extraction)
//!     → Option<AuthenticatedUser> or AuthFailure
//! ```

pub mod identity;
pub mod jwks;
pub mod validator;

pub use identity::AuthenticatedUser;
pub use jwks::{resolve_signing_key, KeyError, SigningKey};
pub use validator::{bearer_token, AuthFailure, TokenValidator};

/// Header carrying the authenticated user's stable identifier to backends.
pub const X_USER_ID: &str = "x-user-id";
