//! Non-authoritative index of minted session tokens.
//!
//! Token validation is stateless (by signature); this index exists only so
//! operators can see how many capabilities are outstanding. Expired
//! entries are purged opportunistically on insert.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use infermesh_auth::SessionToken;
use tokio::sync::Mutex;

/// Observability record for one minted token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Unique token id (the `jti`).
    pub token_id: String,
    /// The bound agent.
    pub agent_id: String,
    /// The requesting client.
    pub client_id: String,
    /// The requested model.
    pub model: String,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

/// Shared, cloneable token index.
#[derive(Clone, Default)]
pub struct TokenIndex {
    inner: Arc<Mutex<HashMap<String, IssuedToken>>>,
}

impl TokenIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a minted token, purging entries that expired before `now`.
    pub async fn insert(&self, token: &SessionToken, now: DateTime<Utc>) {
        let mut inner = self.inner.lock().await;
        inner.retain(|_, t| t.expires_at > now);
        inner.insert(
            token.token_id.clone(),
            IssuedToken {
                token_id: token.token_id.clone(),
                agent_id: token.agent_id.clone(),
                client_id: token.client_id.clone(),
                model: token.model.clone(),
                expires_at: token.expires_at,
            },
        );
    }

    /// Number of tokens that have not expired as of `now`.
    pub async fn active(&self, now: DateTime<Utc>) -> usize {
        let inner = self.inner.lock().await;
        inner.values().filter(|t| t.expires_at > now).count()
    }
}
