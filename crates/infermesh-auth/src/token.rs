//! Session-token claims and the minted-token record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Signed claims of a session token.
///
/// Any holder of the coordinator's public key can verify these offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Unique token id.
    pub jti: String,
    /// Issuer identifier.
    pub iss: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Not-before, unix seconds; equals `iat`.
    pub nbf: i64,
    /// Expiry, unix seconds; `iat` plus the configured TTL.
    pub exp: i64,
    /// The agent this capability is bound to.
    pub agent_id: String,
    /// The requesting client.
    pub client_id: String,
    /// The requested model.
    pub model: String,
}

/// A minted session token, as returned to the surface layer.
#[derive(Debug, Clone)]
pub struct SessionToken {
    /// Unique token id; also the `jti` claim.
    pub token_id: String,
    /// The bound agent.
    pub agent_id: String,
    /// The requesting client.
    pub client_id: String,
    /// The requested model.
    pub model: String,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
    /// The signed compact token handed to the client.
    pub jwt: String,
}
