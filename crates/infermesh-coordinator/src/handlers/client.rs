//! REST-compatible client surface.
//!
//! A small `/api/v1` facade mirroring the control-plane operations that
//! clients need: liveness, system status, and inference routing. Served on
//! its own port so client traffic can be firewalled separately from agent
//! traffic.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use infermesh_registry::{AgentStatus, Registry};
use infermesh_scheduler::Scheduler;

use crate::error::ApiError;
use crate::handlers::inference::{route_inference, InferenceRequest, InferenceResponse};
use crate::handlers::status::StatusQuery;
use crate::state::CoordinatorState;

/// Client-facing liveness response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientHealth {
    /// Always `"healthy"` while the process serves requests.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Response timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Client-facing system status.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientSystemStatus {
    /// Registered agent count.
    pub total_agents: usize,
    /// Agents currently healthy.
    pub healthy_agents: usize,
    /// Response timestamp.
    pub timestamp: DateTime<Utc>,
    /// Per-agent detail, when `include_agents=true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<ClientAgentStatus>>,
}

/// Per-agent detail in the client status response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientAgentStatus {
    /// Agent id.
    pub id: String,
    /// Direct endpoint.
    pub endpoint: String,
    /// Collapsed status.
    pub status: AgentStatus,
    /// Total VRAM in MB.
    pub total_vram_mb: i64,
    /// Free VRAM in MB.
    pub free_vram_mb: i64,
    /// Total RAM in MB.
    pub total_ram_mb: i64,
    /// Free RAM in MB.
    pub free_ram_mb: i64,
    /// Running jobs.
    pub running_jobs: i32,
    /// Queued jobs.
    pub queued_jobs: i32,
    /// Concurrency cap.
    pub max_jobs: i32,
    /// Last measured RTT in ms.
    pub rtt_ms: f64,
    /// Latest heartbeat time.
    pub last_heartbeat: DateTime<Utc>,
    /// Models the agent serves; empty means any.
    pub supported_models: Vec<String>,
}

/// `GET /api/v1/health` - client liveness probe.
pub async fn health<R, S>(
    State(state): State<Arc<CoordinatorState<R, S>>>,
) -> Json<ClientHealth>
where
    R: Registry + 'static,
    S: Scheduler + 'static,
{
    Json(ClientHealth {
        status: "healthy".to_string(),
        service: "infermesh-coordinator".to_string(),
        timestamp: state.clock.now(),
    })
}

/// `GET /api/v1/status` - system status for clients.
pub async fn system_status<R, S>(
    State(state): State<Arc<CoordinatorState<R, S>>>,
    Query(query): Query<StatusQuery>,
) -> Json<ClientSystemStatus>
where
    R: Registry + 'static,
    S: Scheduler + 'static,
{
    let stats = state.registry.get_stats().await;

    let agents = if query.include_agents {
        let snapshot = state.registry.list_all_agents().await;
        Some(
            snapshot
                .into_iter()
                .map(|agent| ClientAgentStatus {
                    id: agent.id,
                    endpoint: agent.endpoint,
                    status: agent.status,
                    total_vram_mb: agent.total_vram_mb,
                    free_vram_mb: agent.free_vram_mb,
                    total_ram_mb: agent.total_ram_mb,
                    free_ram_mb: agent.free_ram_mb,
                    running_jobs: agent.running_jobs,
                    queued_jobs: agent.queued_jobs,
                    max_jobs: agent.max_jobs,
                    rtt_ms: agent.rtt_ms,
                    last_heartbeat: agent.last_heartbeat,
                    supported_models: agent.supported_models,
                })
                .collect(),
        )
    } else {
        None
    };

    Json(ClientSystemStatus {
        total_agents: stats.total,
        healthy_agents: stats.healthy,
        timestamp: state.clock.now(),
        agents,
    })
}

/// `POST /api/v1/inference/request` - route an inference request.
///
/// # Errors
///
/// Same contract as the control-plane inference endpoint.
pub async fn request_inference<R, S>(
    State(state): State<Arc<CoordinatorState<R, S>>>,
    Json(request): Json<InferenceRequest>,
) -> Result<Json<InferenceResponse>, ApiError>
where
    R: Registry + 'static,
    S: Scheduler + 'static,
{
    let response = route_inference(&state, &request).await?;
    Ok(Json(response))
}
