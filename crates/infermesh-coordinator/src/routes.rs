//! Router configuration.
//!
//! Two routers share one state: the control router carries the full
//! control-plane surface (agents and routing clients), and the client
//! router carries the REST-compatible `/api/v1` facade.

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use infermesh_registry::Registry;
use infermesh_scheduler::Scheduler;

use crate::handlers::{agents, client, health, inference, keys, status};
use crate::state::CoordinatorState;

/// Create the control-plane router.
///
/// # Routes
///
/// - `GET /health` - liveness probe
/// - `POST /v1/inference` - route an inference request
/// - `POST /v1/agents` - register an agent
/// - `DELETE /v1/agents/{agent_id}` - deregister an agent
/// - `POST /v1/agents/{agent_id}/performance` - post a throughput sample
/// - `GET /v1/health/stream` - heartbeat WebSocket
/// - `GET /v1/status` - system status (`?include_agents=true`)
/// - `GET /v1/public-key` - session-token verification key
pub fn control_router<R, S>(state: CoordinatorState<R, S>) -> Router
where
    R: Registry + 'static,
    S: Scheduler + 'static,
{
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout;
    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health::liveness))
        .route("/v1/inference", post(inference::request_inference::<R, S>))
        .route("/v1/agents", post(agents::register_agent::<R, S>))
        .route(
            "/v1/agents/{agent_id}",
            delete(agents::deregister_agent::<R, S>),
        )
        .route(
            "/v1/agents/{agent_id}/performance",
            post(agents::report_performance::<R, S>),
        )
        .route("/v1/health/stream", get(health::health_stream::<R, S>))
        .route("/v1/status", get(status::system_status::<R, S>))
        .route("/v1/public-key", get(keys::public_key::<R, S>))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Create the REST-compatible client router.
///
/// # Routes
///
/// - `GET /api/v1/health` - liveness probe
/// - `GET /api/v1/status` - system status (`?include_agents=true`)
/// - `POST /api/v1/inference/request` - route an inference request
pub fn client_router<R, S>(state: CoordinatorState<R, S>) -> Router
where
    R: Registry + 'static,
    S: Scheduler + 'static,
{
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout;
    let state = Arc::new(state);

    Router::new()
        .route("/api/v1/health", get(client::health::<R, S>))
        .route("/api/v1/status", get(client::system_status::<R, S>))
        .route(
            "/api/v1/inference/request",
            post(client::request_inference::<R, S>),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
