//! Shared coordinator state.
//!
//! One instance is built in the construction root and shared by both
//! routers. The registry and scheduler are generic seams so tests can
//! substitute fakes.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use infermesh_auth::TokenSigner;
use infermesh_core::{Clock, IdGenerator};
use infermesh_registry::Registry;
use infermesh_scheduler::Scheduler;

use crate::config::CoordinatorConfig;
use crate::tokens::TokenIndex;

/// Shared application state for the coordinator surface.
pub struct CoordinatorState<R, S>
where
    R: Registry,
    S: Scheduler,
{
    /// The agent registry.
    pub registry: Arc<R>,
    /// The agent scheduler.
    pub scheduler: Arc<S>,
    /// The session-token signing authority.
    pub signer: Arc<TokenSigner>,
    /// Unique-id source for job ids.
    pub ids: Arc<dyn IdGenerator>,
    /// The process clock.
    pub clock: Arc<dyn Clock>,
    /// Non-authoritative index of minted tokens.
    pub tokens: TokenIndex,
    /// Coordinator configuration.
    pub config: CoordinatorConfig,
    /// When this coordinator started.
    pub started_at: DateTime<Utc>,
}

impl<R, S> CoordinatorState<R, S>
where
    R: Registry,
    S: Scheduler,
{
    /// Create the coordinator state; stamps the start time off the clock.
    #[must_use]
    pub fn new(
        registry: Arc<R>,
        scheduler: Arc<S>,
        signer: Arc<TokenSigner>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        config: CoordinatorConfig,
    ) -> Self {
        let started_at = clock.now();
        Self {
            registry,
            scheduler,
            signer,
            ids,
            clock,
            tokens: TokenIndex::new(),
            config,
            started_at,
        }
    }

    /// Time elapsed since the coordinator started.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.clock.now() - self.started_at
    }
}

impl<R, S> Clone for CoordinatorState<R, S>
where
    R: Registry,
    S: Scheduler,
{
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            scheduler: Arc::clone(&self.scheduler),
            signer: Arc::clone(&self.signer),
            ids: Arc::clone(&self.ids),
            clock: Arc::clone(&self.clock),
            tokens: self.tokens.clone(),
            config: self.config.clone(),
            started_at: self.started_at,
        }
    }
}
