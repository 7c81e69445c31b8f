//! Round-robin agent selection.
//!
//! A deliberately simple alternative to MCDA: healthy agents are rotated
//! in id order. Useful when predictable spreading matters more than
//! placement quality, and as a baseline in tests.

use std::sync::Arc;

use async_trait::async_trait;
use infermesh_registry::{AgentRecord, Registry};
use tokio::sync::Mutex;

use crate::error::{Result, ScheduleError};
use crate::mcda::Scheduler;

/// Minimum free VRAM (MB) for the lenient round-robin compatibility check.
const MIN_FREE_VRAM_MB: i64 = 1024;

/// Round-robin [`Scheduler`] over healthy agents.
pub struct RoundRobinScheduler<R> {
    registry: Arc<R>,
    cursor: Mutex<usize>,
}

impl<R: Registry> RoundRobinScheduler<R> {
    /// Create a round-robin scheduler over the given registry.
    #[must_use]
    pub fn new(registry: Arc<R>) -> Self {
        Self {
            registry,
            cursor: Mutex::new(0),
        }
    }

    fn compatible(agent: &AgentRecord, model: &str) -> bool {
        if agent.free_vram_mb < MIN_FREE_VRAM_MB {
            return false;
        }
        if agent.running_jobs >= agent.max_jobs {
            return false;
        }
        agent.supported_models.is_empty()
            || agent.supported_models.iter().any(|m| m == model)
    }
}

#[async_trait]
impl<R: Registry> Scheduler for RoundRobinScheduler<R> {
    async fn select_agent(&self, model: &str) -> Result<AgentRecord> {
        let mut agents = self.registry.list_healthy_agents().await;
        if agents.is_empty() {
            return Err(ScheduleError::NoAgentsAvailable);
        }
        // Stable rotation order regardless of map iteration order.
        agents.sort_by(|a, b| a.id.cmp(&b.id));

        let mut compatible: Vec<AgentRecord> = agents
            .iter()
            .filter(|a| Self::compatible(a, model))
            .cloned()
            .collect();
        if compatible.is_empty() {
            tracing::warn!(model, "No agents match the requested model, using any healthy agent");
            compatible = agents;
        }

        let mut cursor = self.cursor.lock().await;
        let selected = compatible[*cursor % compatible.len()].clone();
        *cursor = cursor.wrapping_add(1);
        drop(cursor);

        tracing::info!(
            agent_id = %selected.id,
            endpoint = %selected.endpoint,
            model,
            free_vram_mb = selected.free_vram_mb,
            running_jobs = selected.running_jobs,
            "Agent selected (round robin)"
        );

        Ok(selected)
    }
}
