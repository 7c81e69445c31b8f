//! Public-key distribution.
//!
//! Agents fetch the verification key at startup (and again on signature
//! failures) so they can validate session tokens without calling back.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use infermesh_registry::Registry;
use infermesh_scheduler::Scheduler;

use crate::state::CoordinatorState;

/// The verification key and its metadata.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    /// PEM-encoded SubjectPublicKeyInfo.
    pub public_key_pem: String,
    /// Signature algorithm, `RS256`.
    pub algorithm: String,
    /// Token issuer identifier.
    pub issuer: String,
    /// Id of the current signing key.
    pub key_id: String,
}

/// `GET /v1/public-key` - return the verification key.
pub async fn public_key<R, S>(
    State(state): State<Arc<CoordinatorState<R, S>>>,
) -> Json<PublicKeyResponse>
where
    R: Registry + 'static,
    S: Scheduler + 'static,
{
    tracing::debug!("Public key requested");
    Json(PublicKeyResponse {
        public_key_pem: state.signer.public_key_pem().to_string(),
        algorithm: state.signer.algorithm().to_string(),
        issuer: state.signer.issuer().to_string(),
        key_id: state.signer.key_id().to_string(),
    })
}
