//! Agent registration and lifecycle endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use infermesh_registry::{AgentRegistration, Registry};
use infermesh_scheduler::Scheduler;

use crate::error::ApiError;
use crate::state::CoordinatorState;

/// Response to a successful registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegistrationResponse {
    /// Always `"success"` on the 200 path.
    pub status: String,
    /// Human-readable confirmation.
    pub message: String,
    /// Heartbeat cadence the agent should adopt.
    pub heartbeat_interval_seconds: u64,
}

/// A throughput sample posted by an observability hook.
#[derive(Debug, Deserialize, Serialize)]
pub struct PerformanceReport {
    /// Observed generation throughput.
    pub tokens_per_sec: f64,
}

/// `POST /v1/agents` - register an agent.
///
/// Registration replaces any prior record under the same id and suggests a
/// heartbeat interval of half the liveness timeout.
///
/// # Errors
///
/// `InvalidArgument` when required fields are missing or invalid.
pub async fn register_agent<R, S>(
    State(state): State<Arc<CoordinatorState<R, S>>>,
    Json(registration): Json<AgentRegistration>,
) -> Result<impl IntoResponse, ApiError>
where
    R: Registry + 'static,
    S: Scheduler + 'static,
{
    if registration.agent_id.is_empty() {
        return Err(ApiError::InvalidArgument("agent_id is required".into()));
    }
    if registration.endpoint.is_empty() {
        return Err(ApiError::InvalidArgument("endpoint is required".into()));
    }

    tracing::info!(
        agent_id = %registration.agent_id,
        endpoint = %registration.endpoint,
        total_vram_mb = registration.total_vram_mb,
        max_jobs = registration.max_jobs,
        supported_models = ?registration.supported_models,
        "Agent registration request"
    );

    state.registry.register(registration).await?;

    Ok(Json(RegistrationResponse {
        status: "success".to_string(),
        message: "agent registered".to_string(),
        heartbeat_interval_seconds: state.config.suggested_heartbeat_interval().as_secs(),
    }))
}

/// `DELETE /v1/agents/{agent_id}` - remove an agent from rotation.
///
/// # Errors
///
/// `NotFound` when the id is unknown.
pub async fn deregister_agent<R, S>(
    State(state): State<Arc<CoordinatorState<R, S>>>,
    Path(agent_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    R: Registry + 'static,
    S: Scheduler + 'static,
{
    state.registry.deregister(&agent_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /v1/agents/{agent_id}/performance` - post a throughput sample.
///
/// Feeds the scheduler's performance history.
///
/// # Errors
///
/// `NotFound` when the id is unknown.
pub async fn report_performance<R, S>(
    State(state): State<Arc<CoordinatorState<R, S>>>,
    Path(agent_id): Path<String>,
    Json(report): Json<PerformanceReport>,
) -> Result<impl IntoResponse, ApiError>
where
    R: Registry + 'static,
    S: Scheduler + 'static,
{
    // Reject samples for agents we have never seen.
    state.registry.get_agent(&agent_id).await?;
    state
        .scheduler
        .record_performance(&agent_id, report.tokens_per_sec)
        .await;

    tracing::debug!(
        agent_id = %agent_id,
        tokens_per_sec = report.tokens_per_sec,
        "Performance sample recorded"
    );

    Ok(StatusCode::ACCEPTED)
}
