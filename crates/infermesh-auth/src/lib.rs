//! Session-token signing authority.
//!
//! The coordinator mints short-lived RS256 session tokens that bind a
//! client and model to one agent. Agents validate tokens offline: they
//! fetch the coordinator's public key once and verify signatures and the
//! time window without calling back.
//!
//! A fresh 2048-bit RSA key pair is generated per process; there is no
//! rotation within a process lifetime, but every token carries a `kid`
//! header so rotation can be added without changing the claims schema.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use infermesh_auth::{TokenConfig, TokenSigner};
//! use infermesh_core::{SystemClock, UuidGenerator};
//!
//! # fn example() -> infermesh_auth::Result<()> {
//! let signer = TokenSigner::new(
//!     TokenConfig::default(),
//!     Arc::new(SystemClock),
//!     Arc::new(UuidGenerator),
//! )?;
//!
//! let token = signer.mint("gpu-01", "client-7", "llama3:7b")?;
//! let claims = signer.verify(&token.jwt)?;
//! assert_eq!(claims.agent_id, "gpu-01");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod signer;
pub mod token;

pub use error::{AuthError, Result};
pub use signer::TokenSigner;
pub use token::{SessionClaims, SessionToken};

use std::time::Duration;

/// Configuration for the signing authority.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Issuer embedded in the `iss` claim and returned with the public key.
    pub issuer: String,
    /// Session-token lifetime.
    pub token_ttl: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: "infermesh-coordinator".to_string(),
            token_ttl: Duration::from_secs(120),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TokenConfig::default();
        assert_eq!(config.issuer, "infermesh-coordinator");
        assert_eq!(config.token_ttl, Duration::from_secs(120));
    }
}
