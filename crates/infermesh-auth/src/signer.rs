//! RSA key-pair generation, token minting, and offline verification.

use std::sync::Arc;

use chrono::Duration;
use infermesh_core::{Clock, IdGenerator};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::{AuthError, Result};
use crate::token::{SessionClaims, SessionToken};
use crate::TokenConfig;

const KEY_BITS: usize = 2048;

/// The signing authority.
///
/// Owns the process private key exclusively; only the verification key
/// leaves this struct, PEM-encoded by value.
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    public_key_pem: String,
    key_id: String,
    config: TokenConfig,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl TokenSigner {
    /// Generate a fresh RSA key pair and build the signer.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyGeneration` if key generation or PEM
    /// encoding fails; callers treat this as fatal at startup.
    pub fn new(
        config: TokenConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, KEY_BITS)
            .map_err(|e| AuthError::KeyGeneration(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| AuthError::KeyGeneration(e.to_string()))?;
        let public_key_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| AuthError::KeyGeneration(e.to_string()))?;

        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| AuthError::KeyGeneration(e.to_string()))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| AuthError::KeyGeneration(e.to_string()))?;

        let key_id = ids.generate();
        tracing::info!(key_id = %key_id, bits = KEY_BITS, "Signing key pair generated");

        Ok(Self {
            encoding_key,
            decoding_key,
            public_key_pem,
            key_id,
            config,
            clock,
            ids,
        })
    }

    /// Mint a session token binding `client_id` and `model` to `agent_id`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if the RS256 signature cannot be
    /// produced.
    pub fn mint(&self, agent_id: &str, client_id: &str, model: &str) -> Result<SessionToken> {
        let issued_at = self.clock.now();
        let ttl_secs = i64::try_from(self.config.token_ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = issued_at + Duration::seconds(ttl_secs);

        let claims = SessionClaims {
            jti: self.ids.generate(),
            iss: self.config.issuer.clone(),
            iat: issued_at.timestamp(),
            nbf: issued_at.timestamp(),
            exp: issued_at.timestamp() + ttl_secs,
            agent_id: agent_id.to_string(),
            client_id: client_id.to_string(),
            model: model.to_string(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key_id.clone());

        let jwt = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok(SessionToken {
            token_id: claims.jti,
            agent_id: claims.agent_id,
            client_id: claims.client_id,
            model: claims.model,
            issued_at,
            expires_at,
            jwt,
        })
    }

    /// Verify a token offline and return its claims.
    ///
    /// The signature and issuer are checked through the JWT library; the
    /// `[nbf, exp)` window is checked against the injected clock so tests
    /// and production agree on a single time source.
    ///
    /// # Errors
    ///
    /// Returns a typed error for bad signatures, wrong issuers, malformed
    /// tokens, and tokens outside their validity window.
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.config.issuer]);
        // Window checks run against the injected clock below.
        validation.validate_exp = false;
        validation.validate_nbf = false;

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                _ => AuthError::InvalidToken(e.to_string()),
            },
        )?;

        let claims = data.claims;
        let now = self.clock.now().timestamp();
        if now < claims.nbf {
            return Err(AuthError::NotYetValid);
        }
        if now >= claims.exp {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }

    /// The verification key, PEM-encoded (SubjectPublicKeyInfo).
    #[must_use]
    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    /// The signature algorithm name.
    #[must_use]
    pub const fn algorithm(&self) -> &'static str {
        "RS256"
    }

    /// The issuer identifier embedded in minted tokens.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.config.issuer
    }

    /// The id of the current signing key, as stamped into `kid` headers.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The configured token lifetime.
    #[must_use]
    pub const fn token_ttl(&self) -> std::time::Duration {
        self.config.token_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infermesh_core::{ManualClock, SequentialIdGenerator};

    fn signer_with_clock() -> (TokenSigner, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let signer = TokenSigner::new(
            TokenConfig::default(),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::new(SequentialIdGenerator::new("tok")),
        )
        .unwrap();
        (signer, clock)
    }

    #[test]
    fn mint_and_verify_round_trip() {
        let (signer, clock) = signer_with_clock();
        let token = signer.mint("gpu-01", "client-7", "llama3:7b").unwrap();

        let claims = signer.verify(&token.jwt).unwrap();
        assert_eq!(claims.jti, token.token_id);
        assert_eq!(claims.iss, "infermesh-coordinator");
        assert_eq!(claims.agent_id, "gpu-01");
        assert_eq!(claims.client_id, "client-7");
        assert_eq!(claims.model, "llama3:7b");
        assert_eq!(claims.iat, clock.now().timestamp());
        assert_eq!(claims.nbf, claims.iat);
        assert_eq!(claims.exp - claims.iat, 120);
    }

    #[test]
    fn token_ids_come_from_the_id_seam() {
        let (signer, _clock) = signer_with_clock();
        // key id consumed "tok-0", so the first token gets "tok-1".
        let token = signer.mint("a", "c", "m").unwrap();
        assert_eq!(token.token_id, "tok-1");
        let token = signer.mint("a", "c", "m").unwrap();
        assert_eq!(token.token_id, "tok-2");
    }

    #[test]
    fn expires_at_matches_ttl() {
        let (signer, clock) = signer_with_clock();
        let token = signer.mint("a", "c", "m").unwrap();
        assert_eq!(token.expires_at - token.issued_at, Duration::seconds(120));
        assert_eq!(token.issued_at, clock.now());
    }

    #[test]
    fn token_valid_until_just_before_expiry() {
        let (signer, clock) = signer_with_clock();
        let token = signer.mint("a", "c", "m").unwrap();

        clock.advance(Duration::seconds(119));
        assert!(signer.verify(&token.jwt).is_ok());

        clock.advance(Duration::seconds(1));
        assert!(matches!(
            signer.verify(&token.jwt),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn token_not_valid_before_nbf() {
        let (signer, clock) = signer_with_clock();
        let token = signer.mint("a", "c", "m").unwrap();

        clock.advance(Duration::seconds(-5));
        assert!(matches!(
            signer.verify(&token.jwt),
            Err(AuthError::NotYetValid)
        ));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let (signer, _clock) = signer_with_clock();
        let token = signer.mint("a", "c", "m").unwrap();

        // Flip a character in the signature segment.
        let mut parts: Vec<String> = token.jwt.split('.').map(ToString::to_string).collect();
        assert_eq!(parts.len(), 3);
        let sig = parts[2].clone();
        let flipped = if sig.starts_with('A') { "B" } else { "A" };
        parts[2] = format!("{flipped}{}", &sig[1..]);

        assert!(signer.verify(&parts.join(".")).is_err());
    }

    #[test]
    fn token_from_another_authority_is_rejected() {
        let (signer_a, _clock_a) = signer_with_clock();
        let (signer_b, _clock_b) = signer_with_clock();

        let token = signer_a.mint("a", "c", "m").unwrap();
        assert!(signer_b.verify(&token.jwt).is_err());
    }

    #[test]
    fn garbage_token_is_invalid() {
        let (signer, _clock) = signer_with_clock();
        assert!(matches!(
            signer.verify("not-a-token"),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn public_key_is_pem_spki() {
        let (signer, _clock) = signer_with_clock();
        let pem = signer.public_key_pem();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
        assert!(pem.trim_end().ends_with("-----END PUBLIC KEY-----"));
        assert_eq!(signer.algorithm(), "RS256");
        assert_eq!(signer.issuer(), "infermesh-coordinator");
    }

    #[test]
    fn kid_header_is_stamped() {
        let (signer, _clock) = signer_with_clock();
        let token = signer.mint("a", "c", "m").unwrap();
        let header = jsonwebtoken::decode_header(&token.jwt).unwrap();
        assert_eq!(header.kid.as_deref(), Some(signer.key_id()));
        assert_eq!(header.alg, Algorithm::RS256);
    }
}
