//! Error types for token signing and verification.

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur in the signing authority.
#[derive(Debug, Error)]
pub enum AuthError {
    /// RSA key-pair generation or encoding failed. Fatal at startup.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Signing a token failed. Treated as a bug, not a client error.
    #[error("token signing failed: {0}")]
    Signing(String),

    /// The token could not be parsed or its claims are malformed.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The signature does not verify against the public key.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The `iss` claim does not match this authority.
    #[error("invalid token issuer")]
    InvalidIssuer,

    /// The token's expiry has passed.
    #[error("token expired")]
    TokenExpired,

    /// The token's not-before instant is still in the future.
    #[error("token not yet valid")]
    NotYetValid,
}
