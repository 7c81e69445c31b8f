//! System status queries.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use infermesh_registry::{AgentStatus, Registry};
use infermesh_scheduler::Scheduler;

use crate::state::CoordinatorState;

/// Query parameters for a status request.
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    /// Include the full per-agent snapshot.
    #[serde(default)]
    pub include_agents: bool,
}

/// Aggregate system status.
#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    /// Registered agent count.
    pub total_agents: usize,
    /// Agents currently healthy.
    pub healthy_agents: usize,
    /// Time since the coordinator started, e.g. `"413s"`.
    pub uptime: String,
    /// Session tokens minted and not yet expired.
    pub active_tokens: usize,
    /// Per-agent snapshot, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<AgentSummary>>,
}

/// One agent in the status snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub struct AgentSummary {
    /// Agent id.
    pub agent_id: String,
    /// Collapsed status.
    pub status: AgentStatus,
    /// Free VRAM in MB from the latest heartbeat.
    pub free_vram_mb: i64,
    /// Running jobs from the latest heartbeat.
    pub running_jobs: i32,
    /// Latest heartbeat time, unix seconds.
    pub last_heartbeat: i64,
}

/// `GET /v1/status` - aggregate counts, optionally with the agent snapshot.
pub async fn system_status<R, S>(
    State(state): State<Arc<CoordinatorState<R, S>>>,
    Query(query): Query<StatusQuery>,
) -> Json<SystemStatus>
where
    R: Registry + 'static,
    S: Scheduler + 'static,
{
    let stats = state.registry.get_stats().await;
    let now = state.clock.now();

    let agents = if query.include_agents {
        let snapshot = state.registry.list_all_agents().await;
        Some(
            snapshot
                .into_iter()
                .map(|agent| AgentSummary {
                    agent_id: agent.id,
                    status: agent.status,
                    free_vram_mb: agent.free_vram_mb,
                    running_jobs: agent.running_jobs,
                    last_heartbeat: agent.last_heartbeat.timestamp(),
                })
                .collect(),
        )
    } else {
        None
    };

    Json(SystemStatus {
        total_agents: stats.total,
        healthy_agents: stats.healthy,
        uptime: format!("{}s", state.uptime().num_seconds()),
        active_tokens: state.tokens.active(now).await,
        agents,
    })
}
