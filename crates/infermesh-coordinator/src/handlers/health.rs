//! Liveness probe and the heartbeat stream.
//!
//! `ReportHealth` is a bidirectional WebSocket: agents send heartbeat
//! messages, the coordinator applies each to the registry and answers with
//! a one-message ack. A failed apply produces an `"error"` ack but never
//! terminates the stream; dropped streams are benign because the heartbeat
//! timeout owns liveness.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use infermesh_registry::{Heartbeat, Registry};
use infermesh_scheduler::Scheduler;

use crate::state::CoordinatorState;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
}

/// `GET /health` - liveness probe.
pub async fn liveness() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: "infermesh-coordinator",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Per-message acknowledgement on the heartbeat stream.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthAck {
    /// The agent the ack refers to; empty if the message was unparseable.
    pub agent_id: String,
    /// `"ok"` or `"error"`.
    pub status: String,
    /// Detail for the agent's logs.
    pub message: String,
}

/// `GET /v1/health/stream` - upgrade to the heartbeat stream.
pub async fn health_stream<R, S>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<CoordinatorState<R, S>>>,
) -> Response
where
    R: Registry + 'static,
    S: Scheduler + 'static,
{
    ws.on_upgrade(move |socket| run_health_stream(socket, state))
}

/// Read heartbeats until either side closes.
///
/// The reader is single-threaded per stream, so heartbeats from one agent
/// are applied in arrival order.
async fn run_health_stream<R, S>(mut socket: WebSocket, state: Arc<CoordinatorState<R, S>>)
where
    R: Registry,
    S: Scheduler,
{
    while let Some(message) = socket.recv().await {
        let message = match message {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(error = %e, "Heartbeat stream error");
                break;
            }
        };

        let raw = match &message {
            Message::Text(text) => text.as_str().to_string(),
            Message::Close(_) => break,
            // Pings are answered by the protocol layer.
            _ => continue,
        };

        let ack = apply_heartbeat(state.as_ref(), &raw).await;
        let Ok(payload) = serde_json::to_string(&ack) else {
            continue;
        };
        if socket.send(Message::Text(payload.into())).await.is_err() {
            break;
        }
    }

    tracing::debug!("Heartbeat stream closed");
}

/// Apply one raw heartbeat message and build its ack.
pub(crate) async fn apply_heartbeat<R, S>(
    state: &CoordinatorState<R, S>,
    raw: &str,
) -> HealthAck
where
    R: Registry,
    S: Scheduler,
{
    let heartbeat: Heartbeat = match serde_json::from_str(raw) {
        Ok(hb) => hb,
        Err(e) => {
            return HealthAck {
                agent_id: String::new(),
                status: "error".to_string(),
                message: format!("invalid heartbeat: {e}"),
            };
        }
    };

    match state.registry.update_health(&heartbeat).await {
        Ok(()) => HealthAck {
            agent_id: heartbeat.agent_id,
            status: "ok".to_string(),
            message: "health updated".to_string(),
        },
        Err(e) => {
            tracing::warn!(
                agent_id = %heartbeat.agent_id,
                error = %e,
                "Failed to apply heartbeat"
            );
            HealthAck {
                agent_id: heartbeat.agent_id,
                status: "error".to_string(),
                message: e.to_string(),
            }
        }
    }
}
