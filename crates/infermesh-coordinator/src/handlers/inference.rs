//! Inference routing.
//!
//! The coordinator's core operation: validate, pick an agent, mint a
//! session capability, and hand the client the agent's direct endpoint.
//! No inference traffic flows through the coordinator afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use infermesh_registry::Registry;
use infermesh_scheduler::Scheduler;

use crate::error::ApiError;
use crate::state::CoordinatorState;

/// An inference routing request.
#[derive(Debug, Clone, Deserialize)]
pub struct InferenceRequest {
    /// The requesting client.
    #[serde(default)]
    pub client_id: String,
    /// The model to run.
    #[serde(default)]
    pub model: String,
    /// The prompt; forwarded to the agent by the client, not by us.
    #[serde(default)]
    pub prompt: String,
    /// Generation cap; defaults to 100.
    #[serde(default)]
    pub max_tokens: Option<i32>,
    /// Sampling temperature; defaults to 0.7.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Opaque generation parameters, passed through to the agent.
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

/// Routing decision returned to the client.
#[derive(Debug, Serialize, Deserialize)]
pub struct InferenceResponse {
    /// Direct endpoint of the selected agent.
    pub agent_endpoint: String,
    /// Signed session token to present to the agent.
    pub session_token: String,
    /// Token expiry, unix seconds.
    pub expires_at: i64,
    /// Id assigned to this job for tracking.
    pub job_id: String,
    /// Last measured RTT to the selected agent, in ms.
    pub estimated_rtt_ms: f64,
    /// Id of the selected agent.
    pub agent_id: String,
}

/// Validate a request, schedule an agent, and mint a session token.
///
/// Shared by the control-plane and client-surface handlers.
///
/// # Errors
///
/// `InvalidArgument` for missing fields, `Unavailable` when scheduling
/// finds no agent, `Internal` when signing fails.
pub async fn route_inference<R, S>(
    state: &CoordinatorState<R, S>,
    request: &InferenceRequest,
) -> Result<InferenceResponse, ApiError>
where
    R: Registry,
    S: Scheduler,
{
    if request.client_id.is_empty() {
        return Err(ApiError::InvalidArgument("client_id is required".into()));
    }
    if request.model.is_empty() {
        return Err(ApiError::InvalidArgument("model is required".into()));
    }
    if request.prompt.is_empty() {
        return Err(ApiError::InvalidArgument("prompt is required".into()));
    }

    let start = std::time::Instant::now();
    tracing::info!(
        client_id = %request.client_id,
        model = %request.model,
        max_tokens = request.max_tokens.unwrap_or(100),
        temperature = request.temperature.unwrap_or(0.7),
        "Inference request received"
    );

    // A scheduling failure is a coordinator condition, not an agent fault;
    // it is never recorded against any circuit breaker.
    let agent = state
        .scheduler
        .select_agent(&request.model)
        .await
        .map_err(|e| {
            tracing::warn!(model = %request.model, error = %e, "Agent selection failed");
            ApiError::from(e)
        })?;

    let token = state
        .signer
        .mint(&agent.id, &request.client_id, &request.model)
        .map_err(ApiError::from)?;
    state.tokens.insert(&token, state.clock.now()).await;

    let job_id = state.ids.generate();

    tracing::info!(
        agent_id = %agent.id,
        agent_endpoint = %agent.endpoint,
        job_id = %job_id,
        token_id = %token.token_id,
        scheduling_ms = start.elapsed().as_millis() as u64,
        "Inference request routed"
    );

    Ok(InferenceResponse {
        agent_endpoint: agent.endpoint,
        session_token: token.jwt,
        expires_at: token.expires_at.timestamp(),
        job_id,
        estimated_rtt_ms: agent.rtt_ms,
        agent_id: agent.id,
    })
}

/// `POST /v1/inference` - route an inference request.
///
/// # Errors
///
/// See [`route_inference`].
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
