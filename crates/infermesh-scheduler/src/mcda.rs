//! Multi-criteria decision analysis scheduling.
//!
//! Candidates pass a hard admission filter, are scored on four normalized
//! criteria, and the highest-scoring agent wins. Degraded agents stay
//! admissible but their total score is halved.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use infermesh_registry::{AgentRecord, AgentStatus, Registry};
use tokio::sync::RwLock;

use crate::error::{Result, ScheduleError};
use crate::estimate::estimated_vram_requirement;

/// Score multiplier applied to degraded candidates before ranking.
const DEGRADED_PENALTY: f64 = 0.5;

/// Weights for the four MCDA criteria. The defaults are part of the
/// scheduling contract.
#[derive(Debug, Clone, Copy)]
pub struct McdaWeights {
    /// Weight of free-VRAM headroom.
    pub vram: f64,
    /// Weight of job-load headroom.
    pub load: f64,
    /// Weight of network round-trip time.
    pub rtt: f64,
    /// Weight of historical throughput.
    pub perf: f64,
}

impl Default for McdaWeights {
    fn default() -> Self {
        Self {
            vram: 0.40,
            load: 0.30,
            rtt: 0.20,
            perf: 0.10,
        }
    }
}

/// A scored candidate, kept whole so the selection log can show the
/// full breakdown.
#[derive(Debug, Clone)]
pub struct AgentScore {
    /// The candidate agent.
    pub agent: AgentRecord,
    /// Weighted total, after any status penalty.
    pub total: f64,
    /// Free-VRAM sub-score in `[0, 1]`.
    pub vram_score: f64,
    /// Job-load sub-score in `[0, 1]`.
    pub load_score: f64,
    /// RTT sub-score in `[0, 1]`.
    pub rtt_score: f64,
    /// Throughput sub-score in `[0, 1]`.
    pub perf_score: f64,
}

/// Trait defining agent selection.
///
/// A deliberate seam: the surface depends on this trait so tests can
/// substitute a canned scheduler.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Select the best agent to serve `model`.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::NoAgentsAvailable` if no candidate passes
    /// the admission filter, even relaxed.
    async fn select_agent(&self, model: &str) -> Result<AgentRecord>;

    /// Record an observed throughput sample for an agent.
    ///
    /// Implementations without a performance model may ignore samples.
    async fn record_performance(&self, agent_id: &str, tokens_per_sec: f64) {
        let _ = (agent_id, tokens_per_sec);
    }
}

/// Memory-aware MCDA scheduler.
pub struct McdaScheduler<R> {
    registry: Arc<R>,
    weights: McdaWeights,
    perf_history: RwLock<HashMap<String, f64>>,
}

impl<R: Registry> McdaScheduler<R> {
    /// Create a scheduler with the default contract weights.
    #[must_use]
    pub fn new(registry: Arc<R>) -> Self {
        Self::with_weights(registry, McdaWeights::default())
    }

    /// Create a scheduler with custom weights.
    #[must_use]
    pub fn with_weights(registry: Arc<R>, weights: McdaWeights) -> Self {
        Self {
            registry,
            weights,
            perf_history: RwLock::new(HashMap::new()),
        }
    }

    /// Average throughput recorded for an agent, if any.
    pub async fn performance(&self, agent_id: &str) -> Option<f64> {
        self.perf_history.read().await.get(agent_id).copied()
    }

    /// Hard admission constraints a candidate must satisfy before scoring.
    fn admits(agent: &AgentRecord, model: &str) -> bool {
        if !agent.status.is_routable() {
            return false;
        }
        if agent.free_vram_mb < estimated_vram_requirement(model) {
            return false;
        }
        if agent.running_jobs >= agent.max_jobs {
            return false;
        }
        agent.supported_models.is_empty()
            || agent.supported_models.iter().any(|m| m == model)
    }

    fn score_agent(&self, agent: &AgentRecord, history: &HashMap<String, f64>) -> AgentScore {
        let vram_score = 1.0 - agent.vram_utilization();
        let load_score = 1.0 - f64::from(agent.running_jobs) / f64::from(agent.max_jobs.max(1));
        let rtt_score = 1.0 - (agent.rtt_ms / 500.0).min(1.0);
        let perf_score = history
            .get(&agent.id)
            .map_or(0.5, |avg| (avg / 100.0).min(1.0));

        let total = vram_score * self.weights.vram
            + load_score * self.weights.load
            + rtt_score * self.weights.rtt
            + perf_score * self.weights.perf;

        AgentScore {
            agent: agent.clone(),
            total,
            vram_score,
            load_score,
            rtt_score,
            perf_score,
        }
    }
}

#[async_trait]
impl<R: Registry> Scheduler for McdaScheduler<R> {
    async fn select_agent(&self, model: &str) -> Result<AgentRecord> {
        let snapshot = self.registry.list_all_agents().await;
        let history = self.perf_history.read().await;

        let mut candidates: Vec<AgentScore> = snapshot
            .iter()
            .filter(|agent| Self::admits(agent, model))
            .map(|agent| {
                let mut score = self.score_agent(agent, &history);
                if agent.status == AgentStatus::Degraded {
                    score.total *= DEGRADED_PENALTY;
                }
                score
            })
            .collect();

        if candidates.is_empty() {
            tracing::warn!(model, "No compatible agents, relaxing to any healthy agent");
            candidates = snapshot
                .iter()
                .filter(|agent| agent.status == AgentStatus::Healthy)
                .map(|agent| self.score_agent(agent, &history))
                .collect();
        }
        drop(history);

        if candidates.is_empty() {
            return Err(ScheduleError::NoAgentsAvailable);
        }

        // Descending by score; ties broken by ascending agent id so the
        // decision is deterministic.
        candidates.sort_by(|a, b| {
            b.total
                .partial_cmp(&a.total)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.agent.id.cmp(&b.agent.id))
        });

        let selected = candidates
            .into_iter()
            .next()
            .ok_or(ScheduleError::NoAgentsAvailable)?;

        tracing::info!(
            agent_id = %selected.agent.id,
            endpoint = %selected.agent.endpoint,
            model,
            total_score = selected.total,
            vram_score = selected.vram_score,
            load_score = selected.load_score,
            rtt_score = selected.rtt_score,
            perf_score = selected.perf_score,
            free_vram_mb = selected.agent.free_vram_mb,
            running_jobs = selected.agent.running_jobs,
            status = %selected.agent.status,
            "Agent selected"
        );

        Ok(selected.agent)
    }

    async fn record_performance(&self, agent_id: &str, tokens_per_sec: f64) {
        let mut history = self.perf_history.write().await;
        match history.get_mut(agent_id) {
            // Two-sample moving average keeps the estimate bounded and
            // responsive to recent throughput.
            Some(avg) => *avg = (*avg + tokens_per_sec) / 2.0,
            None => {
                history.insert(agent_id.to_string(), tokens_per_sec);
            }
        }
    }
}
